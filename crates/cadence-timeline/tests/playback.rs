use anyhow::Result;
use cadence_timeline::{
    AddOptions, AnimationController, AnimationOptions, AnimationValue, Direction, Effect,
    EasingFunction, FrameClock, IterationCount, KeyframeSpec, ManualFrameSource, Millis, PlayState,
    Plugin, PluginRegistry, PropertyOptions, Resolvable, SetOptions, TargetId, TargetResolver,
    TargetSpec, Timeline, TimelineDefaults, TimelineError, TimelineEvent, ValueStore,
    ValueStorePlugin, interpolator,
};
use std::cell::RefCell;
use std::rc::Rc;

const EPSILON: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

struct Harness {
    clock: FrameClock,
    source: ManualFrameSource,
    plugins: PluginRegistry,
    store: ValueStore,
    timeline: Timeline,
}

fn harness() -> Harness {
    let (clock, source) = FrameClock::manual();
    let store = ValueStore::new();
    let plugins = PluginRegistry::new();
    plugins.register(Rc::new(ValueStorePlugin::new(store.clone())));
    let timeline = Timeline::builder(clock.clone(), plugins.clone())
        .defaults(TimelineDefaults {
            easing: EasingFunction::Linear,
            playback_rate: 1.0,
        })
        .build();
    Harness {
        clock,
        source,
        plugins,
        store,
        timeline,
    }
}

fn value(h: &Harness, target: &str, prop: &str) -> f64 {
    h.store
        .number(&TargetId::from(target), prop)
        .unwrap_or(f64::NAN)
}

fn record(timeline: &Timeline, event: TimelineEvent) -> Rc<RefCell<Vec<f64>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    timeline.on(event, move |time| sink.borrow_mut().push(time));
    seen
}

fn slide(target: &str, values: [f64; 2]) -> AnimationOptions {
    AnimationOptions::new(TargetSpec::id(target)).prop("store", "x", PropertyOptions::values(values))
}

#[test]
fn three_iterations_finish_exactly_once() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).duration(1000.0))?;
    let finishes = record(&h.timeline, TimelineEvent::Finish);
    let updates = record(&h.timeline, TimelineEvent::Update);

    h.timeline.play(3, Direction::Normal);
    for _ in 0..12 {
        h.clock.advance(250.0);
    }

    assert_eq!(h.timeline.state(), PlayState::Finished);
    assert_eq!(*finishes.borrow(), vec![1000.0]);
    assert!(approx_eq(value(&h, "box", "x"), 100.0));

    // one update per tick plus one per restart
    assert_eq!(updates.borrow().len(), 12 + 2);

    // extra frames after finishing change nothing
    h.clock.advance(250.0);
    assert_eq!(finishes.borrow().len(), 1);
    Ok(())
}

#[test]
fn alternate_bounces_back() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).duration(1000.0))?;

    h.timeline.play(2, Direction::Alternate);
    h.clock.advance(1000.0);
    assert_eq!(h.timeline.iteration(), Some(1));
    assert_eq!(h.timeline.playback_rate(), -1.0);
    assert_eq!(h.timeline.current_time(), Some(1000.0));

    h.clock.advance(250.0);
    assert_eq!(h.timeline.current_time(), Some(750.0));
    assert!(approx_eq(value(&h, "box", "x"), 75.0));

    h.clock.advance(750.0);
    assert_eq!(h.timeline.state(), PlayState::Finished);
    assert_eq!(h.timeline.current_time(), Some(0.0));
    assert!(approx_eq(value(&h, "box", "x"), 0.0));
    Ok(())
}

#[test]
fn infinite_keeps_running() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).duration(100.0))?;
    h.timeline.play(IterationCount::Infinite, Direction::Normal);

    for _ in 0..50 {
        h.clock.advance(30.0);
    }
    // overshoot past the end is dropped, so each iteration takes 4 ticks
    assert_eq!(h.timeline.state(), PlayState::Running);
    assert_eq!(h.timeline.iteration(), Some(12));
    assert_eq!(h.timeline.current_time(), Some(60.0));
    Ok(())
}

#[test]
fn seek_twice_is_idempotent() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).duration(1000.0))?;
    h.timeline.pause();

    h.timeline.seek(300.0)?;
    let first = (h.timeline.state(), h.timeline.current_time(), value(&h, "box", "x"));
    h.timeline.seek(300.0)?;
    let second = (h.timeline.state(), h.timeline.current_time(), value(&h, "box", "x"));

    assert_eq!(first, second);
    assert!(approx_eq(second.2, 30.0));
    Ok(())
}

#[test]
fn opacity_fades_linearly() -> Result<()> {
    let h = harness();
    h.timeline.add(
        AddOptions::new(
            AnimationOptions::new(TargetSpec::id("card"))
                .easing(EasingFunction::Linear)
                .prop("store", "opacity", PropertyOptions::values([1.0, 0.0])),
        )
        .from(0.0)
        .to(1000.0),
    )?;

    h.timeline.pause();
    h.timeline.seek(500.0)?;
    assert!(approx_eq(value(&h, "card", "opacity"), 0.5));
    Ok(())
}

#[test]
fn gap_fill_spaces_keyframes_evenly() -> Result<()> {
    let h = harness();
    let anim = AnimationOptions::new(TargetSpec::id("box")).prop(
        "store",
        "x",
        PropertyOptions::values([0.0, 5.0, 10.0, 20.0]),
    );
    h.timeline.add(AddOptions::new(anim).duration(900.0))?;

    let effects = h.timeline.get_effects();
    assert_eq!(effects.len(), 1);
    let offsets: Vec<f64> = effects[0].keyframes.iter().map(|k| k.offset).collect();
    assert_eq!(offsets, vec![0.0, 300.0 / 900.0, 600.0 / 900.0, 1.0]);
    Ok(())
}

#[test]
fn later_definition_overwrites_shared_time() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).from(0.0).to(1000.0))?;
    let overwrite = AnimationOptions::new(TargetSpec::id("box")).prop(
        "store",
        "x",
        PropertyOptions::keyframes(vec![KeyframeSpec::value(200.0).at(1.0)]),
    );
    h.timeline.add(AddOptions::new(overwrite).from(0.0).to(1000.0))?;

    let effects = h.timeline.get_effects();
    let last = effects[0].keyframes.last().map(|k| k.value.clone());
    assert_eq!(last, Some(AnimationValue::Number(200.0)));
    Ok(())
}

#[test]
fn sequential_definitions_chain() -> Result<()> {
    let h = harness();
    h.timeline
        .add(AddOptions::new(slide("box", [0.0, 100.0])).duration(500.0))?
        .add(
            AddOptions::new(
                AnimationOptions::new(TargetSpec::id("box")).prop("store", "x", PropertyOptions::to(0.0)),
            )
            .duration(500.0),
        )?;
    assert_eq!(h.timeline.duration(), 1000.0);

    h.timeline.pause();
    h.timeline.seek(500.0)?;
    assert!(approx_eq(value(&h, "box", "x"), 100.0));
    h.timeline.seek(750.0)?;
    assert!(approx_eq(value(&h, "box", "x"), 50.0));
    Ok(())
}

#[test]
fn set_holds_previous_value_until_its_time() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 10.0])).from(0.0).to(1000.0))?;
    h.timeline.set(
        SetOptions::new(
            AnimationOptions::new(TargetSpec::id("box")).prop("store", "x", PropertyOptions::to(50.0)),
        )
        .at(1500.0),
    )?;
    assert_eq!(h.timeline.duration(), 1500.0);

    h.timeline.pause();
    h.timeline.seek(1200.0)?;
    assert!(approx_eq(value(&h, "box", "x"), 10.0));
    h.timeline.seek(1499.0)?;
    assert!(approx_eq(value(&h, "box", "x"), 10.0));
    h.timeline.seek(1500.0)?;
    assert!(approx_eq(value(&h, "box", "x"), 50.0));
    Ok(())
}

#[test]
fn clock_released_after_finish() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 1.0])).duration(100.0))?;
    h.timeline.play(1, Direction::Normal);
    assert!(h.source.is_pending());

    h.clock.on_frame(1000.0);
    h.clock.on_frame(1050.0);
    h.clock.on_frame(1100.0);

    assert_eq!(h.timeline.state(), PlayState::Finished);
    assert_eq!(h.clock.subscriber_count(), 0);
    assert!(!h.source.is_pending());

    let requests = h.source.requests();
    h.clock.on_frame(1116.0);
    assert_eq!(h.source.requests(), requests);
    Ok(())
}

#[test]
fn cancel_restores_and_allows_redefinition() -> Result<()> {
    let h = harness();
    let target = TargetId::from("box");
    h.store.set(&target, "x", 42.0);
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).duration(1000.0))?;
    let cancels = record(&h.timeline, TimelineEvent::Cancel);

    h.timeline.play(1, Direction::Normal);
    h.clock.advance(600.0);
    assert!(approx_eq(value(&h, "box", "x"), 60.0));

    let locked = h
        .timeline
        .add(AddOptions::new(slide("box", [0.0, 1.0])).duration(10.0))
        .err();
    assert_eq!(locked, Some(TimelineError::DefinitionLocked));

    h.timeline.cancel();
    assert_eq!(value(&h, "box", "x"), 42.0);
    assert_eq!(*cancels.borrow(), vec![0.0]);
    assert_eq!(h.timeline.state(), PlayState::Idle);

    h.timeline.add(AddOptions::new(slide("box", [0.0, 1.0])).duration(10.0))?;
    Ok(())
}

#[test]
fn reverse_from_end_plays_backwards() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).duration(1000.0))?;
    h.timeline.finish();
    assert_eq!(h.timeline.current_time(), Some(1000.0));

    h.timeline.reverse();
    h.timeline.play(1, Direction::Normal);
    h.clock.advance(400.0);
    assert_eq!(h.timeline.current_time(), Some(600.0));
    assert!(approx_eq(value(&h, "box", "x"), 60.0));
    Ok(())
}

#[test]
fn missing_interval_is_rejected() {
    let h = harness();
    let result = h.timeline.add(AddOptions::new(slide("box", [0.0, 1.0])).from(100.0));
    assert_eq!(result.err(), Some(TimelineError::MissingInterval));
    assert_eq!(h.timeline.duration(), 0.0);
}

#[test]
fn events_follow_control_calls() -> Result<()> {
    let h = harness();
    h.timeline.add(AddOptions::new(slide("box", [0.0, 1.0])).duration(100.0))?;
    let log = Rc::new(RefCell::new(Vec::new()));
    for event in TimelineEvent::ALL {
        let sink = Rc::clone(&log);
        h.timeline.on(event, move |_| sink.borrow_mut().push(event));
    }

    h.timeline.play(1, Direction::Normal);
    h.clock.advance(50.0);
    h.timeline.pause();
    h.timeline.play(1, Direction::Normal);
    h.clock.advance(50.0);

    assert_eq!(
        *log.borrow(),
        vec![
            TimelineEvent::Play,
            TimelineEvent::Update,
            TimelineEvent::Pause,
            TimelineEvent::Play,
            TimelineEvent::Update,
            TimelineEvent::Finish,
        ]
    );
    Ok(())
}

#[test]
fn json_definition_drives_store() -> Result<()> {
    let h = harness();
    let add: AddOptions = serde_json::from_str(
        r#"{
            "targets": ["a", "b"],
            "from": 0,
            "to": "1s",
            "easing": "linear",
            "store": { "x": [0, 100], "label": ["off", "on"] }
        }"#,
    )?;
    h.timeline.add(add)?;

    h.timeline.pause();
    h.timeline.seek("0.25s")?;
    assert!(approx_eq(value(&h, "a", "x"), 25.0));
    assert!(approx_eq(value(&h, "b", "x"), 25.0));
    assert_eq!(
        h.store.get(&TargetId::from("a"), "label"),
        Some(AnimationValue::Text("off".into()))
    );

    h.timeline.seek("+=500ms")?;
    assert_eq!(
        h.store.get(&TargetId::from("a"), "label"),
        Some(AnimationValue::Text("on".into()))
    );
    Ok(())
}

#[test]
fn json_definition_uses_named_references() -> Result<()> {
    let h = harness();
    let timeline = Timeline::builder(h.clock.clone(), h.plugins.clone())
        .defaults(TimelineDefaults {
            easing: EasingFunction::Linear,
            playback_rate: 1.0,
        })
        .reference("dots", TargetSpec::from(vec![TargetSpec::id("a"), TargetSpec::id("b")]))
        .reference("wave", Resolvable::<Millis>::per_target(|ctx| ctx.index as Millis * 100.0))
        .reference(
            "peak",
            Resolvable::<AnimationValue>::per_target(|ctx| {
                AnimationValue::Number((ctx.index as f64 + 1.0) * 10.0)
            }),
        )
        .reference(
            "snap",
            interpolator(|from: &AnimationValue, to: &AnimationValue, t: f64| {
                if t < 1.0 { from.clone() } else { to.clone() }
            }),
        )
        .build();

    let add: AddOptions = serde_json::from_str(
        r#"{
            "targets": "@dots",
            "from": 0,
            "to": 100,
            "delay": "@wave",
            "store": { "x": { "value": [0, "@peak"], "interpolate": "@snap" } }
        }"#,
    )?;
    timeline.add(add)?;

    let windows: Vec<_> = timeline
        .get_effects()
        .iter()
        .map(|e| (e.target.to_string(), e.from, e.to))
        .collect();
    assert_eq!(
        windows,
        vec![("a".to_string(), 0.0, 100.0), ("b".to_string(), 100.0, 200.0)]
    );

    timeline.pause();
    timeline.seek(50.0)?;
    assert_eq!(value(&h, "a", "x"), 0.0, "snap holds until the segment ends");

    timeline.finish();
    assert_eq!(value(&h, "a", "x"), 10.0);
    assert_eq!(value(&h, "b", "x"), 20.0);

    let unknown: AddOptions =
        serde_json::from_str(r#"{ "targets": "c", "duration": 10, "delay": "@nope", "store": { "x": 1 } }"#)?;
    timeline.cancel();
    assert_eq!(
        timeline.add(unknown).err(),
        Some(TimelineError::UnknownReference("@nope".into()))
    );
    Ok(())
}

#[test]
fn per_target_values_resolve_by_index() -> Result<()> {
    let h = harness();
    let anim = AnimationOptions::new(TargetSpec::from(vec!["a", "b", "c"])).prop(
        "store",
        "x",
        PropertyOptions::keyframes(vec![KeyframeSpec::value(Resolvable::per_target(|ctx| {
            AnimationValue::Number(ctx.index as f64 * 10.0)
        }))]),
    );
    h.timeline.add(AddOptions::new(anim).duration(100.0))?;
    h.timeline.finish();

    assert_eq!(value(&h, "a", "x"), 0.0);
    assert_eq!(value(&h, "b", "x"), 10.0);
    assert_eq!(value(&h, "c", "x"), 20.0);
    Ok(())
}

// ============================================================================
// Custom plugin and resolver
// ============================================================================

type ActivityLog = Rc<RefCell<Vec<(String, f64, bool)>>>;

struct ActivityPlugin {
    log: ActivityLog,
}

struct ActivityController {
    target: String,
    log: ActivityLog,
}

impl Plugin for ActivityPlugin {
    fn name(&self) -> &str {
        "activity"
    }

    fn get_value(&self, _target: &TargetId, _prop: &str) -> AnimationValue {
        AnimationValue::Number(0.0)
    }

    fn animate(&self, effect: &Effect) -> Option<Box<dyn AnimationController>> {
        Some(Box::new(ActivityController {
            target: effect.target.to_string(),
            log: Rc::clone(&self.log),
        }))
    }
}

impl AnimationController for ActivityController {
    fn update(&mut self, offset: f64, _rate: f64, is_active: bool) {
        self.log.borrow_mut().push((self.target.clone(), offset, is_active));
    }

    fn cancel(&mut self) {}
}

struct DotResolver;

impl TargetResolver for DotResolver {
    fn query(&self, selector: &str) -> Vec<TargetId> {
        match selector {
            ".dot" => vec!["d1".into(), "d2".into()],
            _ => Vec::new(),
        }
    }
}

#[test]
fn controllers_active_only_inside_their_window() -> Result<()> {
    let log: ActivityLog = Rc::new(RefCell::new(Vec::new()));
    let (clock, _source) = FrameClock::manual();
    let plugins = PluginRegistry::new();
    plugins.register(Rc::new(ActivityPlugin { log: Rc::clone(&log) }));
    let timeline = Timeline::builder(clock.clone(), plugins)
        .resolver(Rc::new(DotResolver))
        .build();

    let anim = AnimationOptions::new(TargetSpec::selector(".dot"))
        .stagger(100.0)
        .prop("activity", "x", PropertyOptions::to(1.0));
    timeline.add(AddOptions::new(anim).from(0.0).to(100.0))?;
    // d1 spans 100..200, d2 spans 200..300
    assert_eq!(timeline.duration(), 300.0);

    timeline.play(1, Direction::Normal);
    clock.advance(150.0);

    let entries = log.borrow().clone();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "d1");
    assert!(approx_eq(entries[0].1, 0.5));
    assert!(entries[0].2);
    assert_eq!(entries[1].0, "d2");
    assert!(approx_eq(entries[1].1, 0.0));
    assert!(!entries[1].2);
    Ok(())
}

#[test]
fn plugins_registered_late_are_seen() -> Result<()> {
    let h = harness();
    let log: ActivityLog = Rc::new(RefCell::new(Vec::new()));
    h.plugins.register(Rc::new(ActivityPlugin { log: Rc::clone(&log) }));

    let anim = AnimationOptions::new(TargetSpec::id("box")).prop("activity", "x", PropertyOptions::to(1.0));
    h.timeline.add(AddOptions::new(anim).duration(100.0))?;
    h.timeline.finish();

    assert_eq!(log.borrow().last().map(|e| e.1), Some(1.0));
    Ok(())
}

// ============================================================================
// Out-of-range positions
// ============================================================================

fn long_slide(h: &Harness) -> Result<()> {
    h.timeline.add(AddOptions::new(slide("box", [0.0, 100.0])).duration(1000.0))?;
    Ok(())
}

#[test]
fn seek_outside_range_while_running_ends_iteration() -> Result<()> {
    let h = harness();
    long_slide(&h)?;
    h.timeline.play(1, Direction::Normal);
    h.clock.advance(100.0);
    h.timeline.seek(-500.0)?;
    h.clock.advance(16.0);
    assert_eq!(h.timeline.state(), PlayState::Finished);
    assert_eq!(h.timeline.current_time(), Some(1000.0));

    let h = harness();
    long_slide(&h)?;
    h.timeline.set_playback_rate(-1.0)?;
    h.timeline.play(1, Direction::Normal);
    h.clock.advance(100.0);
    assert_eq!(h.timeline.current_time(), Some(900.0));
    h.timeline.seek(5000.0)?;
    h.clock.advance(16.0);
    assert_eq!(h.timeline.state(), PlayState::Finished);
    assert_eq!(h.timeline.current_time(), Some(0.0));
    Ok(())
}

#[test]
fn play_from_outside_range_starts_at_direction_bound() -> Result<()> {
    let h = harness();
    long_slide(&h)?;
    h.timeline.pause();
    h.timeline.seek(5000.0)?;
    h.timeline.play(1, Direction::Normal);
    h.clock.advance(16.0);
    assert_eq!(h.timeline.state(), PlayState::Running);
    assert_eq!(h.timeline.current_time(), Some(16.0));

    let h = harness();
    long_slide(&h)?;
    h.timeline.set_playback_rate(-1.0)?;
    h.timeline.pause();
    h.timeline.seek(-100.0)?;
    h.timeline.play(1, Direction::Normal);
    h.clock.advance(16.0);
    assert_eq!(h.timeline.state(), PlayState::Running);
    assert_eq!(h.timeline.current_time(), Some(984.0));
    Ok(())
}
