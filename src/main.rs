use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use argh::FromArgs;
use log::{error, info, warn};

use defgraph_r::graphfile::{HYPERGRAPH_FILE, VERTEX_INFO_FILE};
use defgraph_r::{
    place_file, DriverPolicy, ExtractOptions, NetlistError, NetlistExtractor, PlaceOptions,
};

#[derive(FromArgs)]
/// DEF to hypergraph converter
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Extract(ExtractArgs),
    Place(PlaceArgs),
}

#[derive(FromArgs)]
/// write hypergraph.txt and vertex_info.txt for a DEF file
#[argh(subcommand, name = "extract")]
struct ExtractArgs {
    /// def file
    #[argh(option, short = 'd')]
    def: String,

    /// output directory
    #[argh(option, short = 'o', default = "String::from(\".\")")]
    out: String,

    /// net to leave out, may be repeated (e.g. clk_i)
    #[argh(option)]
    skip_net: Vec<String>,

    /// let INPUT top-level pins drive their nets
    #[argh(switch)]
    input_drivers: bool,

    /// postscript view of the fixed vertices
    #[argh(option)]
    postscript: Option<String>,
}

#[derive(FromArgs)]
/// write placer coordinates into a DEF file
#[argh(subcommand, name = "place")]
struct PlaceArgs {
    /// def file
    #[argh(option, short = 'd')]
    def: String,

    /// coordinate file, one x,y pair per movable component
    #[argh(option, short = 'c')]
    coords: String,

    /// output def file
    #[argh(option, short = 'o')]
    out: String,

    /// also rewrite components that are already PLACED
    #[argh(switch)]
    replace_placed: bool,
}

fn extract(args: ExtractArgs) -> Result<(), NetlistError> {
    let options = ExtractOptions {
        skip_nets: args.skip_net,
        driver_policy: if args.input_drivers {
            DriverPolicy::InputPins
        } else {
            DriverPolicy::FirstListed
        },
    };
    let extractor = NetlistExtractor::new(options);
    let netlist = extractor.extract_file(Path::new(&args.def))?;
    netlist.summarize();

    let dir = PathBuf::from(&args.out);
    fs::create_dir_all(&dir).map_err(|e| NetlistError::Io {
        path: dir.clone(),
        source: e,
    })?;
    if let Err(e) = netlist.write_outputs(&dir) {
        // Remove whatever was written before the failure.
        for name in [HYPERGRAPH_FILE, VERTEX_INFO_FILE] {
            let _ = fs::remove_file(dir.join(name));
        }
        return Err(e);
    }

    if let Some(ps) = args.postscript {
        netlist.postscript(Path::new(&ps))?;
    }
    Ok(())
}

fn place(args: PlaceArgs) -> Result<(), NetlistError> {
    let mut out = PathBuf::from(&args.out);
    if !out
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("def"))
    {
        out.set_extension("def");
        warn!("Output renamed to {}", out.display());
    }
    let options = PlaceOptions {
        replace_placed: args.replace_placed,
    };
    let placed = place_file(
        Path::new(&args.def),
        Path::new(&args.coords),
        &out,
        &options,
    )?;
    info!("{} components placed", placed);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arguments: Args = argh::from_env();
    let result = match arguments.command {
        Command::Extract(a) => extract(a),
        Command::Place(a) => place(a),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
