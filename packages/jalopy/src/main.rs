#[macro_use]
extern crate tracing;

use jalopy::{
    frame_clock::{
        FrameClock,
        Tick,
    },
    logging::init_logging,
    render::{
        draw_world,
        FrameRecorder,
    },
    settings::{
        Settings,
        SETTINGS_FILE_NAME,
    },
    wheel::MAX_WHEEL_FORCE,
    world::World,
};
use std::{
    env::args,
    time::Duration,
};
use anyhow::Result;


const CLI_INTRO: &'static str = r#"This is Jalopy.

A springy two-wheeled car bounces down an endless platform course, chasing
letter-carrying aliens."#;

const CLI_HELP: &'static str = r#"
Examples:

    [this command]
    Record a run as PNG frames.

    [this command] --realtime
    Run paced against the wall clock, without recording.

    [this command] --seed=7 --seconds=60 --throttle=0.8
    Record a longer run with explicit options.

Settings not given on the command line are read from jalopy.json in the
working directory, if present.

Env var examples:
    RUST_LOG=jalopy=trace
    Changes logging levels"#;


fn main() {
    println!("{}", CLI_INTRO);
    init_logging();

    let args = args().collect::<Vec<_>>();
    if args.get(1).map(String::as_str) == Some("--help") {
        println!("{}", CLI_HELP);
        return;
    }
    let settings = settings_from_cli(&args);

    if let Err(e) = run(&settings) {
        error!(%e, "run failed");
    }
}

// layer CLI overrides over the settings file
fn settings_from_cli(args: &Vec<String>) -> Settings {
    let mut settings = Settings::read(SETTINGS_FILE_NAME);
    for arg in args.iter().skip(1) {
        if let Some(val) = arg.strip_prefix("--width=") {
            settings.width = val.parse().expect("malformed --width");
        } else if let Some(val) = arg.strip_prefix("--height=") {
            settings.height = val.parse().expect("malformed --height");
        } else if let Some(val) = arg.strip_prefix("--fps=") {
            settings.fps = val.parse().expect("malformed --fps");
        } else if let Some(val) = arg.strip_prefix("--seconds=") {
            settings.seconds = val.parse().expect("malformed --seconds");
        } else if let Some(val) = arg.strip_prefix("--seed=") {
            settings.seed = val.parse().expect("malformed --seed");
        } else if let Some(val) = arg.strip_prefix("--throttle=") {
            settings.throttle = val.parse().expect("malformed --throttle");
        } else if let Some(val) = arg.strip_prefix("--frames=") {
            settings.frames_dir = val.to_owned();
        } else if let Some(val) = arg.strip_prefix("--stride=") {
            settings.frame_stride = val.parse().expect("malformed --stride");
        } else if arg == "--realtime" {
            settings.realtime = true;
        } else {
            warn!(%arg, "ignoring unrecognized argument");
        }
    }
    settings
}

fn run(settings: &Settings) -> Result<()> {
    let dot_size = settings.height * 0.05;
    let mut world = World::new(settings.width, settings.height, dot_size, settings.seed);
    world.set_wheel_force(settings.throttle * MAX_WHEEL_FORCE);

    if settings.realtime {
        run_realtime(settings, &mut world)
    } else {
        run_recorded(settings, &mut world)
    }
}

// fixed-step run, recording every nth frame
fn run_recorded(settings: &Settings, world: &mut World) -> Result<()> {
    let mut recorder = match settings.frame_stride {
        0 => None,
        _ => {
            info!(dir = %settings.frames_dir, "recording frames");
            Some(FrameRecorder::new(&settings.frames_dir)?)
        }
    };
    let tick = Tick::fixed(settings.fps);
    let frames = (settings.seconds * settings.fps as f64).ceil() as u64;
    for frame in 0..frames {
        world.frame(tick);
        if let Some(recorder) = recorder.as_mut() {
            if frame % settings.frame_stride as u64 == 0 {
                recorder.record(&draw_world(world))?;
            }
        }
    }
    info!(
        letters = world.letters_collected(),
        distance = world.wheel_midpoint(),
        "finished"
    );
    Ok(())
}

// wall-clock-paced run, logging progress once a second
fn run_realtime(settings: &Settings, world: &mut World) -> Result<()> {
    info!("running realtime");
    let frame = Duration::from_secs(1) / settings.fps;
    let frames = (settings.seconds * settings.fps as f64).ceil() as u64;
    let mut clock = FrameClock::start();
    for n in 0..frames {
        let tick = clock.tick();
        world.frame(tick);
        if n % settings.fps as u64 == 0 {
            debug!(
                letters = world.letters_collected(),
                distance = world.wheel_midpoint(),
                "progress"
            );
        }
        clock.pace(frame);
    }
    info!(
        letters = world.letters_collected(),
        distance = world.wheel_midpoint(),
        "finished"
    );
    Ok(())
}
