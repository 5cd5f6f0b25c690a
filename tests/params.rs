//! Run parameters and evaluation sizes.

use cv_crestereo::params::{EvalSize, Params, DEFAULT_FPS};
use cv_crestereo::prelude::*;

#[test]
fn size_is_height_first() -> Result<()> {
    let size: EvalSize = "1024x1536".parse()?;

    assert_eq!(size.height, 1024);
    assert_eq!(size.width, 1536);
    assert_eq!(size.half(), (512, 768));
    assert_eq!(size.to_string(), "1024x1536");

    Ok(())
}

#[test]
fn bad_sizes_are_rejected() {
    for bad in ["", "1024", "1024x", "x1536", "axb", "0x16", "100x160", "16x16x16", "-16x16"] {
        assert!(
            matches!(EvalSize::parse(bad), Err(Error::InvalidSize(..))),
            "accepted {:?}",
            bad
        );
    }
}

#[test]
fn defaults_match_the_demo() -> Result<()> {
    let params = Params::default();

    assert_eq!(params.eval_size()?, EvalSize { height: 1024, width: 1536 });
    assert_eq!(params.fps, DEFAULT_FPS);
    assert_eq!(params.colormap, Colormap::Inferno);
    assert!(params.max_frames.is_none());

    Ok(())
}

#[test]
fn toml_keys_override_defaults() -> Result<()> {
    let params = Params::from_toml_str(
        r#"
        size = "768x1024"
        colormap = "gray"
        max_frames = 20
        "#
    )?;

    assert_eq!(params.eval_size()?, EvalSize { height: 768, width: 1024 });
    assert_eq!(params.colormap, Colormap::Gray);
    assert_eq!(params.max_frames, Some(20));
    assert_eq!(params.fps, DEFAULT_FPS);

    Ok(())
}

#[test]
fn unknown_toml_keys_are_errors() {
    assert!(matches!(
        Params::from_toml_str("n_iter = 20"),
        Err(Error::Config(_))
    ));
}

#[test]
fn config_file_is_loaded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run.toml");
    std::fs::write(&path, "fps = 25\njpeg_quality = 70\n")?;

    let params = Params::from_file(&path)?;
    assert_eq!(params.fps, 25);
    assert_eq!(params.jpeg_quality, 70);

    assert!(matches!(
        Params::from_file(dir.path().join("missing.toml")),
        Err(Error::MissingPath { what: "config", .. })
    ));

    Ok(())
}

#[test]
fn oversized_sizes_are_rejected() -> Result<()> {
    assert_eq!(EvalSize::parse("8192x8192")?, EvalSize { height: 8192, width: 8192 });

    for big in ["8208x16", "16x8208", "4294967280x16", "16x4294967280"] {
        assert!(
            matches!(EvalSize::parse(big), Err(Error::InvalidSize(..))),
            "accepted {:?}",
            big
        );
    }

    Ok(())
}

#[test]
fn colormap_spellings_match_the_command_line() -> Result<()> {
    for name in ["gray", "grey"] {
        let params = Params::from_toml_str(&format!("colormap = \"{}\"", name))?;
        assert_eq!(params.colormap, Colormap::Gray);
        assert_eq!(name.parse::<Colormap>()?, Colormap::Gray);
    }

    Ok(())
}
