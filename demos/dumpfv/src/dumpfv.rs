//! Firmware-image dumper interface skeleton. Independent diagnostic
//! utility; out of scope beyond its CLI shape.

use argh::FromArgs;

/// Dump the contents of a firmware volume image.
#[derive(FromArgs)]
struct Args {
    /// path to the firmware volume image
    #[argh(positional)]
    image: String,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    run(&args.image)
}

fn run(_image: &str) -> anyhow::Result<()> {
    todo!("firmware volume dumping is out of scope for the filesystem stack")
}
