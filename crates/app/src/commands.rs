use anyhow::{Context, Result, bail};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

use seq_core::{Project, ProjectStore, Session, Tempo};

use crate::config::Config;
use crate::grid::{describe_cell, parse_step, render_grid};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn store(config: &Config) -> ProjectStore {
    ProjectStore::new(&config.projects_dir)
}

fn open_session(store: &ProjectStore, name: &str) -> Result<Session> {
    let project = store
        .load(name)
        .with_context(|| format!("failed to load project '{name}'"))?;
    Ok(Session::from_project(&project)?)
}

fn load_samples(config: &Config, session: &mut Session) -> Result<()> {
    let failures = session.load_samples(&config.samples_dir)?;
    for (track, error) in failures {
        warn!(%track, "sample unavailable: {error:#}");
    }
    Ok(())
}

pub fn new_project(config: &Config, name: &str, bpm: f64, force: bool) -> Result<()> {
    let store = store(config);
    if store.exists(name) && !force {
        bail!("project '{name}' already exists (use --force to replace it)");
    }

    let project = Project::with_default_kit(name, Tempo::new(bpm));
    let path = store.save(&project)?;
    println!("created {} at {} BPM", path.display(), project.bpm);
    Ok(())
}

pub fn list_projects(config: &Config) -> Result<()> {
    let store = store(config);
    let names = store.list()?;
    if names.is_empty() {
        println!("no projects in {}", store.root().display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn show(config: &Config, name: &str) -> Result<()> {
    let session = open_session(&store(config), name)?;
    println!("{name} @ {}", session.tempo());
    print!("{}", render_grid(session.tracks(), &session.pattern(), None));
    Ok(())
}

pub fn toggle(config: &Config, name: &str, track: &str, step: &str) -> Result<()> {
    let store = store(config);
    let mut session = open_session(&store, name)?;

    let track_id = session
        .find_track(track)
        .with_context(|| format!("no track '{track}'"))?;
    let step = parse_step(step).with_context(|| format!("step must be 1 to 16, got '{step}'"))?;

    let on = session.toggle(track_id, step)?;
    store.save(&session.to_project(name))?;
    println!("{}", describe_cell(&session.tracks()[track_id.index()], step, on));
    Ok(())
}

pub fn clear(config: &Config, name: &str) -> Result<()> {
    let store = store(config);
    let mut session = open_session(&store, name)?;
    session.clear_pattern();
    store.save(&session.to_project(name))?;
    println!("cleared {name}");
    Ok(())
}

pub fn tempo(config: &Config, name: &str, bpm: f64) -> Result<()> {
    let store = store(config);
    let mut session = open_session(&store, name)?;
    let applied = session.set_bpm(bpm)?;
    store.save(&session.to_project(name))?;

    if applied.bpm() != bpm {
        println!("{bpm} BPM is out of range, using {applied}");
    } else {
        println!("tempo set to {applied}");
    }
    Ok(())
}

pub fn export(config: &Config, name: &str, output: &Path, channels: u16) -> Result<()> {
    let mut session = open_session(&store(config), name)?;
    load_samples(config, &mut session)?;

    let job = session.prepare_render(channels);
    job.run_to_file(output)
        .with_context(|| format!("failed to export '{name}'"))?;
    println!("wrote {}", output.display());
    Ok(())
}

pub fn play(config: &Config, name: &str, bars: u32) -> Result<()> {
    let mut session = open_session(&store(config), name)?;
    session.spawn_sample_loading(&config.samples_dir);
    session.set_start_lead(config.start_lead());
    session.attach_output()?;

    let tempo = session.tempo();
    let duration = config.start_lead() + Duration::from_secs_f64(tempo.bar_secs() * bars as f64);

    println!("playing {name} @ {tempo} for {bars} bar(s)");
    session.start()?;

    let started = Instant::now();
    let mut shown = None;
    while started.elapsed() < duration {
        let cursor = session.poll();
        if cursor != shown {
            if let Some(position) = session.position() {
                println!("{position}");
            }
            shown = cursor;
        }
        thread::sleep(POLL_INTERVAL);
    }

    session.stop()?;
    // let the last hits ring out before the stream closes
    thread::sleep(Duration::from_millis(300));
    session.poll();
    Ok(())
}
