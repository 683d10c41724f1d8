use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use tacpho_core::{CoreError, Launcher};
use tacpho_schema::ImageRef;
use tracing::info;

pub fn run(launcher: &Launcher, image: &ImageRef, json: bool) -> Result<u8, CoreError> {
    info!(
        "pulling {image} with {}; this may take several minutes...",
        launcher.runtime().name()
    );
    let pb = spinner(&format!("pulling {image}…"));
    launcher.pull(image).map_err(|e| {
        spin_fail(&pb, "pull failed");
        e
    })?;
    spin_ok(&pb, &format!("pulled {image}"));

    if json {
        let payload = serde_json::json!({
            "image": image.to_string(),
            "name": image.name,
            "tag": image.tag,
            "pulled": true,
        });
        println!("{}", json_pretty(&payload)?);
    }
    Ok(EXIT_SUCCESS)
}
