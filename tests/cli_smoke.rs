use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_gridfold")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "gridfold.exe"
            } else {
                "gridfold"
            });
            p
        })
}

#[test]
fn cli_detect_then_crop_writes_outputs() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let img_path = dir.join("table.png");
    let grid_path = dir.join("grid.json");
    let sel_path = dir.join("selections.json");
    let out_path = dir.join("out.png");
    let _ = std::fs::remove_file(&out_path);

    // 120x80 white image with one 2px horizontal rule at y=40.
    let mut img = image::RgbaImage::from_pixel(120, 80, image::Rgba([255, 255, 255, 255]));
    for y in 40..42 {
        for x in 0..120 {
            img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
        }
    }
    img.save(&img_path).unwrap();

    std::fs::write(&sel_path, r#"[{"x0":0.0,"y0":10.0,"x1":120.0,"y1":20.0}]"#).unwrap();

    let status = std::process::Command::new(exe())
        .args(["detect", "--in"])
        .arg(&img_path)
        .arg("--out")
        .arg(&grid_path)
        .status()
        .unwrap();
    assert!(status.success());

    let grid: gridfold::Grid =
        serde_json::from_str(&std::fs::read_to_string(&grid_path).unwrap()).unwrap();
    assert_eq!(grid.horizontal.len(), 3);
    assert_eq!(grid.vertical.len(), 2);

    let status = std::process::Command::new(exe())
        .args(["crop", "--in"])
        .arg(&img_path)
        .arg("--selections")
        .arg(&sel_path)
        .arg("--grid")
        .arg(&grid_path)
        .args(["--mode", "horizontal", "--smart", "--out"])
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let out = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (120, 70));
}

#[test]
fn cli_erase_roundtrips_grid_json() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let grid_path = dir.join("erase_in.json");
    let out_path = dir.join("erase_out.json");

    let grid = gridfold::Grid {
        horizontal: vec![
            gridfold::GridLine::full_span(0.0, 0.0, 100.0),
            gridfold::GridLine::full_span(50.0, 1.0, 100.0),
            gridfold::GridLine::full_span(100.0, 0.0, 100.0),
        ],
        vertical: vec![
            gridfold::GridLine::full_span(0.0, 0.0, 100.0),
            gridfold::GridLine::full_span(100.0, 0.0, 100.0),
        ],
    };
    let f = std::fs::File::create(&grid_path).unwrap();
    serde_json::to_writer_pretty(f, &grid).unwrap();

    let status = std::process::Command::new(exe())
        .args(["erase", "--grid"])
        .arg(&grid_path)
        .args(["--at", "50,50", "--whole-line", "--out"])
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let edited: gridfold::Grid =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(edited.horizontal.len(), 2);
}
