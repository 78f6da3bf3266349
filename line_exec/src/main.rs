//! # Line executable
//!
//! Builds the racing line for a track file and saves it, along with the corners and the
//! optimiser report, into a new session directory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use structopt::StructOpt;

use line_lib::{
    line::{LineParams, LineSource, RacingLine},
    track::ClosedPath,
};
use track_if::track::TrackSpec;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "line_exec", about = "Build the racing line for a track")]
struct Args {
    /// Track file (JSON)
    #[structopt(parse(from_os_str))]
    track: PathBuf,

    /// Also write the line to this file
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Line parameter file, relative to the params directory
    #[structopt(long, default_value = "line.toml")]
    params: String,

    /// Follow the centreline if the optimiser fails instead of exiting
    #[structopt(long)]
    fallback: bool,

    /// Log at trace level
    #[structopt(short, long)]
    verbose: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("line_exec", "sessions").wrap_err("Failed to create the session")?;

    let level = if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Racing Line Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS AND TRACK ----

    let params: LineParams =
        util::params::load(&args.params).wrap_err("Could not load line params")?;

    let track = TrackSpec::load(&args.track)
        .wrap_err_with(|| format!("Could not load the track from {:?}", args.track))?;
    info!("Loaded track {:?}, road width {} m", args.track, track.road_width_m);

    let centreline =
        ClosedPath::from_spec(&track.centreline).wrap_err("The track centreline is invalid")?;
    info!(
        "Centreline has {} points, {:.2} m long",
        centreline.len(),
        centreline.perimeter()
    );

    // ---- BUILD ----

    let built = if args.fallback {
        RacingLine::build_or_fallback(&centreline, track.road_width_m, &params)
    } else {
        RacingLine::build(&centreline, track.road_width_m, &params)
    };
    let line = built.wrap_err("Failed to build the racing line")?;

    if line.source() == LineSource::CentrelineFallback {
        warn!("The saved line follows the centreline");
    }

    for (i, c) in line.corners().iter().enumerate() {
        info!(
            "Corner {}: {:?}, points {} to {}, apex at {}, peak radius {:.1} m",
            i,
            c.turn,
            c.start_index,
            c.end_index,
            c.apex_index,
            1.0 / c.peak_curvature_m.abs()
        );
    }
    info!(
        "Line length {:.2} m, estimated lap time {:.2} s",
        line.length_m(),
        line.lap_time_s()
    );

    // ---- SAVE ----

    session.save("racing_line.json", line.points().to_vec());
    session.save("corners.json", line.corners().to_vec());
    if let Some(report) = line.report() {
        session.save("optimiser_report.json", *report);
    }

    if let Some(ref output) = args.output {
        line.save_json(output)
            .wrap_err_with(|| format!("Could not write the line to {:?}", output))?;
        info!("Line written to {:?}", output);
    }

    session.exit();

    Ok(())
}
