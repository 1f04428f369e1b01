#![cfg(feature = "image-io")]

use boardsight::{PreprocessOptions, ScaleSet, TemplateCache};
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;

fn write_icon(path: &std::path::Path, width: u32, height: u32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let img = GrayImage::from_fn(width, height, |_, _| Luma([rng.random_range(0..=255)]));
    img.save(path).unwrap();
}

#[test]
fn directory_templates_are_ordered_and_scaled() {
    let dir = tempfile::tempdir().unwrap();
    write_icon(&dir.path().join("knight.png"), 40, 40, 1);
    write_icon(&dir.path().join("archer.PNG"), 30, 20, 2);
    write_icon(&dir.path().join("field_pekka.png"), 12, 12, 3);
    fs::write(dir.path().join("readme.txt"), "not an icon").unwrap();
    fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

    let cache = TemplateCache::build(
        dir.path(),
        ScaleSet::new(vec![0.5, 1.0]).unwrap(),
        PreprocessOptions::default(),
    )
    .unwrap();

    let ids: Vec<&str> = cache.ids().collect();
    assert_eq!(ids, vec!["archer", "field_pekka", "knight"]);

    // 30x20 at 0.5 is 15x10; 12x12 at 0.5 falls below 10 px.
    assert_eq!(cache.template("archer").unwrap().variants().len(), 2);
    assert_eq!(cache.template("field_pekka").unwrap().variants().len(), 1);
    let half = cache.get("knight", 0.5).unwrap();
    assert_eq!((half.width(), half.height()), (20, 20));
    assert!(cache.get("knight", 0.50001).is_some());
    assert!(cache.get("knight", 0.75).is_none());
    assert_eq!(cache.variant_count(), 5);
}

#[test]
fn missing_directory_gives_empty_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = TemplateCache::build(
        dir.path().join("absent"),
        ScaleSet::identity(),
        PreprocessOptions::default(),
    )
    .unwrap();
    assert!(cache.is_empty());
    assert_eq!(cache.variant_count(), 0);
}
