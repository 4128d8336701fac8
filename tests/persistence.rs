//! Layout storage, file formats and raster export on a real filesystem.

use bento::GRID_CONFIG;
use bento::export::{ExportOptions, card_rect, render_layout};
use bento::io::{
    self, LayoutError, LayoutStore, PLACEHOLDER_IMAGE_URL, export_json, import_json, read_layout,
    write_layout, write_png,
};
use bento::model::{Card, CardSize, Layout};
use bento::random_layout::generate_random_layout;

fn sample_layout() -> Layout {
    let mut hero = Card::with_defaults("hero", CardSize::Large, 0, 0);
    hero.text = "Hello".into();
    hero.background_color = Some("#ff0000".into());
    let mut photo = Card::with_defaults("photo", CardSize::Wide, 4, 0);
    photo.background_image = Some("blob:local/1234".into());
    photo.uploaded_image_id = Some("img-1".into());
    Layout::new("layout-1", "My Portfolio", vec![hero, photo])
}

#[test]
fn store_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = LayoutStore::open(dir.path().join("layouts.json"));
    assert!(store.list().unwrap().is_empty());

    let layout = sample_layout();
    store.save(&layout).unwrap();
    store
        .save(&Layout::new("layout-2", "Second", Vec::new()))
        .unwrap();
    assert_eq!(store.list().unwrap().len(), 2);

    let mut renamed = layout.clone();
    renamed.name = "Renamed".into();
    let stored = store.save(&renamed).unwrap();
    assert!(stored.updated_at >= layout.updated_at);

    let reopened = LayoutStore::open(store.path());
    let all = reopened.list().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(reopened.get("layout-1").unwrap().unwrap().name, "Renamed");

    assert!(reopened.delete("layout-2").unwrap());
    assert!(!reopened.delete("layout-2").unwrap());
    assert_eq!(reopened.list().unwrap().len(), 1);
}

#[test]
fn portable_export_survives_import() {
    let layout = sample_layout();
    let json = export_json(&layout).unwrap();
    let imported = import_json(&json, &GRID_CONFIG).unwrap();

    let photo = imported.card("photo").unwrap();
    assert_eq!(photo.background_image.as_deref(), Some(PLACEHOLDER_IMAGE_URL));
    assert!(photo.uploaded_image_id.is_none());
    assert_eq!(imported.card("hero").unwrap().text, "Hello");
    assert_eq!(imported.cards.len(), layout.cards.len());
}

#[test]
fn overlapping_import_is_rejected() {
    let mut layout = sample_layout();
    layout.cards[1].x = 2;
    let json = serde_json::to_string(&layout).unwrap();
    assert!(matches!(
        import_json(&json, &GRID_CONFIG),
        Err(LayoutError::InvalidFormat(_))
    ));
}

#[test]
fn file_formats_dispatch_on_extension() {
    let dir = tempfile::tempdir().unwrap();
    let layout = sample_layout();

    let bento_path = dir.path().join("portfolio.bento");
    write_layout(&layout, &bento_path).unwrap();
    let raw = std::fs::read(&bento_path).unwrap();
    assert_eq!(&raw[8..12], b"BNT1");
    assert_eq!(read_layout(&bento_path, &GRID_CONFIG).unwrap(), layout);

    let json_path = dir.path().join("portfolio.json");
    write_layout(&layout, &json_path).unwrap();
    let from_json = read_layout(&json_path, &GRID_CONFIG).unwrap();
    assert_eq!(from_json.cards, layout.cards);

    // JSON content under a .bento name is not a project file.
    let bogus = dir.path().join("bogus.bento");
    std::fs::copy(&json_path, &bogus).unwrap();
    assert!(matches!(
        io::load_bento(&bogus, &GRID_CONFIG),
        Err(LayoutError::InvalidFormat(_))
    ));
}

#[test]
fn rendered_layout_writes_a_decodable_png() {
    let dir = tempfile::tempdir().unwrap();
    let layout = sample_layout();
    let opts = ExportOptions::default();
    let rendered = render_layout(&layout.cards, &GRID_CONFIG, &opts);

    let path = dir.path().join("grid.png");
    write_png(&rendered, &path).unwrap();
    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), rendered.dimensions());

    let (x, y, w, h) = card_rect(&layout.cards[0], &GRID_CONFIG, &opts);
    let center = decoded.get_pixel(x + w / 2, y + h / 2);
    assert_eq!(&center.0[..3], &[255, 0, 0]);
    assert_eq!(&decoded.get_pixel(1, 1).0[..3], &[255, 255, 255]);
}

#[test]
fn random_layouts_are_importable() {
    for seed in [1u32, 77, 4096] {
        let layout = Layout::new(
            format!("random-{seed}"),
            "Random",
            generate_random_layout(seed, &GRID_CONFIG),
        );
        let json = export_json(&layout).unwrap();
        assert!(import_json(&json, &GRID_CONFIG).is_ok());
    }
}
