use block_timeline::command::{CommandManager, SessionState, SetSequencerLoopCommand, ToggleBlockCommand};
use block_timeline::messaging::{MidiConsumer, create_midi_channel, create_notification_channel};
use block_timeline::{MidiVoice, TimelineConfig, Transport};
use ringbuf::traits::Consumer;
use std::error::Error;

// Ringbuffer capacity for each voice's MIDI output
// Two events per fired start, drained once per bar
const MIDI_RINGBUFFER_CAPACITY: usize = 64;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    log::info!("=== Block Timeline ===");

    let config = match std::env::args().nth(1) {
        Some(path) => TimelineConfig::load(path)?,
        None => TimelineConfig {
            length: 4,
            tracks: vec!["Kick".into(), "Bass".into()],
            ..TimelineConfig::default()
        },
    };

    let transport = config.build_transport()?;
    let mut timeline = config.build_timeline(transport)?;
    if timeline.sequencer_count() == 0 {
        timeline.add_default_sequencer()?;
    }

    let (notification_tx, mut notification_rx) =
        create_notification_channel(config.notification_capacity);
    timeline.set_notifier(notification_tx);

    // One MIDI output per track
    let mut outputs: Vec<(String, MidiConsumer)> = Vec::new();
    for index in 0..timeline.sequencer_count() {
        let (name, handle) = {
            let sequencer = timeline.sequencer(index)?;
            (sequencer.name().to_string(), sequencer.handle())
        };
        let (midi_tx, midi_rx) = create_midi_channel(MIDI_RINGBUFFER_CAPACITY);
        timeline
            .clock_mut()
            .connect_voice(handle, Box::new(MidiVoice::new(midi_tx)));
        outputs.push((name, midi_rx));
    }

    let mut session = SessionState::new(timeline);
    let mut history: CommandManager<Transport> = config.build_command_manager();

    // Four-on-the-floor on the first track, offbeat bars on the others
    let length = session.timeline().length();
    for track in 0..session.timeline().sequencer_count() {
        for bar in (track % 2..length).step_by(2) {
            history.execute(Box::new(ToggleBlockCommand::new(track, bar)), &mut session)?;
        }
    }
    history.execute(Box::new(SetSequencerLoopCommand::new(true)), &mut session)?;

    while let Some(notification) = notification_rx.try_pop() {
        log::debug!("change: {:?}", notification.change);
    }

    let timeline = session.timeline_mut();
    let ticks_per_bar = timeline.clock().time_signature().ticks_per_bar();
    timeline.clock_mut().play();

    // Two passes over the loop plus the wrap
    for _ in 0..(length * 2) {
        let bar = timeline.current_bar();
        let fired = timeline.clock_mut().advance_ticks(ticks_per_bar);
        log::info!("bar {}: {} registration(s) fired", bar, fired);

        for (name, output) in outputs.iter_mut() {
            while let Some(event) = output.try_pop() {
                log::info!("  {} -> {:?} (+{} ticks)", name, event.event, event.ticks_from_now);
            }
        }
    }

    timeline.clock_mut().stop();
    log::info!(
        "done: {} registrations fired, undo: {:?}",
        timeline.clock().fired_total(),
        history.undo_description()
    );

    Ok(())
}
