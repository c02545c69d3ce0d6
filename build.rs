/// Draws the tray/app icon: a rounded tile with a white pin head and needle.
#[cfg(windows)]
fn make_icon() -> std::path::PathBuf {
    use ico::{IconDir, IconDirEntry, IconImage};
    use image::{ImageBuffer, Rgba};
    use std::path::PathBuf;

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR"));
    let ico_path = out_dir.join("app.ico");

    let mut dir = IconDir::new(ico::ResourceType::Icon);
    for &size in &[16u32, 24, 32, 48, 64, 256] {
        let s = size as f32;
        let corner = s * 0.18;
        let head = (s * 0.5, s * 0.38, s * 0.22);
        let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let (xf, yf) = (x as f32 + 0.5, y as f32 + 0.5);
                let dx = (corner - xf).max(xf - (s - corner)).max(0.0);
                let dy = (corner - yf).max(yf - (s - corner)).max(0.0);
                if dx * dx + dy * dy > corner * corner {
                    continue;
                }
                let in_head = (xf - head.0).powi(2) + (yf - head.1).powi(2) <= head.2 * head.2;
                let in_needle = (xf - head.0).abs() <= (s * 0.05).max(0.6)
                    && yf >= head.1
                    && yf <= s * 0.84;
                let px = if in_head || in_needle {
                    Rgba([245, 245, 245, 255])
                } else {
                    Rgba([196, 43, 28, 255])
                };
                img.put_pixel(x, y, px);
            }
        }
        let icon_image = IconImage::from_rgba_data(size, size, img.into_raw());
        let entry = IconDirEntry::encode(&icon_image).expect("encode icon entry");
        dir.add_entry(entry);
    }
    let mut file = std::fs::File::create(&ico_path).expect("create ico");
    dir.write(&mut file).expect("write ico");
    ico_path
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(windows)]
    {
        use embed_manifest::manifest::DpiAwareness;
        use embed_manifest::{embed_manifest, new_manifest};

        // Per-monitor DPI so SM_CXSMICON reports the real small-icon size.
        embed_manifest(new_manifest("TopMost").dpi_awareness(DpiAwareness::PerMonitorV2))
            .expect("embed manifest");

        let ico_path = make_icon();
        let mut res = winres::WindowsResource::new();
        res.set_icon(&ico_path.to_string_lossy());

        let pkg_ver = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.1.0".into());
        let file_ver = format!("{pkg_ver}.0");
        res.set("FileDescription", "TopMost");
        res.set("ProductName", "TopMost");
        res.set("FileVersion", &file_ver);
        res.set("ProductVersion", &file_ver);
        res.set("InternalName", "topmost");
        res.set("OriginalFilename", "topmost.exe");

        res.compile().expect("failed to compile Windows resources");
    }
}
