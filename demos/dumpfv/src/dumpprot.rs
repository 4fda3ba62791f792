//! Handle/protocol dumper interface skeleton. Independent diagnostic
//! utility; out of scope beyond its CLI shape.

use argh::FromArgs;

/// List firmware handles and the protocols installed on them.
#[derive(FromArgs)]
struct Args {
    /// only show handles implementing this protocol GUID
    #[argh(option)]
    protocol: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    run(args.protocol.as_deref())
}

fn run(_protocol: Option<&str>) -> anyhow::Result<()> {
    todo!("protocol dumping is out of scope for the filesystem stack")
}
