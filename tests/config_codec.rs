//! Configuration files and image output.

use std::io::Write;

use aobake::prelude::*;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_partial_config_file_falls_back_to_defaults() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"{{
            "width": 256,
            "height": 128,
            "occlusion": {{ "quality": 6, "seed": 99 }},
            "invert": false
        }}"#
    )
    .unwrap();

    let config = BakeConfig::load(file.path()).expect("Failed to load config");
    let defaults = BakeConfig::default();
    assert_eq!(config.width, 256);
    assert_eq!(config.height, 128);
    assert_eq!(config.occlusion.quality, 6);
    assert_eq!(config.occlusion.seed, Some(99));
    assert_eq!(config.occlusion.tile_width, defaults.occlusion.tile_width);
    assert_eq!(config.occlusion.zero_hit, ZeroHitPolicy::Keep);
    assert_eq!(config.blur, defaults.blur);
    assert_eq!(config.supersampling, defaults.supersampling);
    assert!(!config.invert);
}

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bake.json");

    let mut config = BakeConfig::default();
    config.occlusion.zero_hit = ZeroHitPolicy::Clear;
    config.blur.sigma = 2.5;
    config.save(&path).unwrap();

    assert_eq!(BakeConfig::load(&path).unwrap(), config);
}

#[test]
fn test_missing_or_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(BakeConfig::load(dir.path().join("nope.json")), Err(Error::Io(_))));

    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "occlusion": { "tile_width": 100 } }"#).unwrap();
    assert!(matches!(BakeConfig::load(&path), Err(Error::InvalidConfig(_))));
}

fn gradient(w: u32, h: u32) -> Image<f32> {
    let data = (0..w * h).map(|i| i as f32 / (w * h - 1) as f32).collect();
    Image::from_vec(w, h, data).unwrap()
}

#[test]
fn test_write_every_container() {
    let dir = TempDir::new().unwrap();
    let writer = ImageCrateWriter;
    let map = DynImage::from(gradient(16, 8));

    for ext in ImageExtension::ALL {
        let path = dir.path().join(format!("ao.{ext}"));
        writer.write_auto(&path, &map).unwrap_or_else(|e| panic!("{ext}: {e}"));
        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len > 0, "{ext} produced an empty file");
    }
}

#[test]
fn test_write_integer_maps() {
    let dir = TempDir::new().unwrap();
    let writer = ImageCrateWriter;

    let gray = DynImage::from(gradient(8, 8).to_u8());
    writer.write_auto(&dir.path().join("gray.png"), &gray).unwrap();

    let indices = DynImage::from(Image::filled(8, 8, NO_TRIANGLE));
    writer.write_auto(&dir.path().join("indices.tga"), &indices).unwrap();

    // Float containers only take float maps
    let err = writer.write_auto(&dir.path().join("gray.hdr"), &gray).unwrap_err();
    assert!(matches!(err, Error::Codec(_)));
    assert!(!dir.path().join("gray.hdr").exists());
}

#[test]
fn test_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let err = ImageCrateWriter
        .write_auto(&dir.path().join("ao.jpg"), &DynImage::from(gradient(4, 4)))
        .unwrap_err();
    assert!(matches!(err, Error::Codec(_)));
}
