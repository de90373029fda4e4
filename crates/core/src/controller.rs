use rand::Rng;

use crate::capture::CaptureGeometry;
use crate::error::Result;
use crate::input::Dispatcher;
use crate::logger;
use crate::settings::Settings;
use crate::types::*;
use crate::vision::{Detection, TemplateMatcher, LAWN, SEED, SUN};

/// Probabilities and thresholds for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub p_click_sun: f64,
    pub p_plant: f64,
    /// Click every sun above `sun_threshold` instead of just the best one.
    pub collect_all_suns: bool,
    pub sun_threshold: f32,
    /// Best matches scoring below this are not clicked.
    pub min_score: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning::from(&Settings::default())
    }
}

impl From<&Settings> for Tuning {
    fn from(s: &Settings) -> Self {
        Self {
            p_click_sun: s.p_click_sun,
            p_plant: s.p_plant,
            collect_all_suns: s.collect_all_suns,
            sun_threshold: s.sun_threshold,
            min_score: s.min_score,
        }
    }
}

/// What one frame's step saw and did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepReport {
    pub detections: Vec<Detection>,
    pub clicks: Vec<ScreenPoint>,
}

/// Decides, frame by frame, what to click.
pub struct Controller {
    state: AutomationState,
    tuning: Tuning,
}

impl Controller {
    pub fn new(tuning: Tuning) -> Self {
        Self { state: AutomationState::Idle, tuning }
    }

    pub fn state(&self) -> AutomationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AutomationState::Running
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn start(&mut self) {
        if !self.is_running() {
            logger::info_p("auto", "automation started");
        }
        self.state = AutomationState::Running;
    }

    pub fn stop(&mut self) {
        if self.is_running() {
            logger::info_p("auto", "automation stopped");
        }
        self.state = AutomationState::Idle;
    }

    pub fn toggle(&mut self) {
        if self.is_running() { self.stop() } else { self.start() }
    }

    /// Apply a state command; `Save` and `Quit` are not ours and change nothing.
    pub fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Toggle => self.toggle(),
            Command::Save | Command::Quit => {}
        }
    }

    /// Run the per-frame logic. Does nothing while idle.
    pub fn step<R: Rng>(
        &self,
        frame: &Frame,
        matcher: &TemplateMatcher,
        geometry: &CaptureGeometry,
        dispatcher: &mut Dispatcher<R>,
    ) -> Result<StepReport> {
        let mut report = StepReport::default();
        if !self.is_running() {
            return Ok(report);
        }

        // Sun
        let suns = if self.tuning.collect_all_suns {
            matcher.detect_all(SUN, frame, self.tuning.sun_threshold)?
        } else {
            let best = matcher.detect(SUN, frame)?;
            if best.score >= self.tuning.min_score { vec![best] } else { Vec::new() }
        };
        for sun in suns {
            let at = geometry.to_screen(sun.bbox.center());
            if dispatcher.click_with_chance(at, self.tuning.p_click_sun)? {
                report.clicks.push(at);
            }
            report.detections.push(sun);
        }

        // Plant: seed packet, then a lawn tile, no check in between
        if dispatcher.roll(self.tuning.p_plant) {
            for name in [SEED, LAWN] {
                let found = matcher.detect(name, frame)?;
                if found.score >= self.tuning.min_score {
                    let at = geometry.to_screen(found.bbox.center());
                    dispatcher.click(at)?;
                    report.clicks.push(at);
                }
                report.detections.push(found);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Inset;
    use crate::platform::stub::StubPlatform;
    use crate::platform::Platform;
    use crate::testutil::{background, dir_with, sprite};
    use crate::vision::TEMPLATE_MARGIN;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Rig {
        frame: Frame,
        matcher: TemplateMatcher,
        geometry: CaptureGeometry,
        platform: StubPlatform,
        _dir: tempfile::TempDir,
    }

    /// Sun at (50, 50), seed at (200, 20), lawn at (120, 150), window at (100, 100).
    fn rig() -> Rig {
        let (sun, seed, lawn) = (sprite(20, 20, 0), sprite(24, 16, 90), sprite(30, 30, 170));
        let mut frame = background(320, 240);
        image::imageops::replace(&mut frame, &sun, 50, 50);
        image::imageops::replace(&mut frame, &seed, 200, 20);
        image::imageops::replace(&mut frame, &lawn, 120, 150);
        let dir = dir_with(&[(SUN, &sun), (SEED, &seed), (LAWN, &lawn)]);
        let geometry =
            CaptureGeometry::from_window_rect(Region::from_ltrb(100, 100, 900, 700), Inset::default()).unwrap();
        Rig {
            frame,
            matcher: TemplateMatcher::new(dir.path()),
            geometry,
            platform: StubPlatform::new(),
            _dir: dir,
        }
    }

    fn tuning(p_click_sun: f64, p_plant: f64) -> Tuning {
        Tuning { p_click_sun, p_plant, ..Tuning::default() }
    }

    fn screen_center(geometry: &CaptureGeometry, x: i32, y: i32, w: u32, h: u32) -> ScreenPoint {
        let (w, h) = ((w + TEMPLATE_MARGIN) as i32, (h + TEMPLATE_MARGIN) as i32);
        geometry.to_screen(FramePoint::new(x + w / 2, y + h / 2))
    }

    #[test]
    fn key_commands_drive_the_state() {
        let mut c = Controller::new(Tuning::default());
        assert_eq!(c.state(), AutomationState::Idle);

        for (key, expected) in [
            ('b', AutomationState::Running),
            ('x', AutomationState::Running),
            ('s', AutomationState::Running),
            ('e', AutomationState::Idle),
            ('e', AutomationState::Idle),
            ('q', AutomationState::Idle),
        ] {
            if let Some(cmd) = Command::from_key(key) {
                c.apply(cmd);
            }
            assert_eq!(c.state(), expected, "after '{}'", key);
        }
    }

    #[test]
    fn toggle_flips_between_states() {
        let mut c = Controller::new(Tuning::default());
        c.apply(Command::Toggle);
        assert!(c.is_running());
        c.apply(Command::Toggle);
        assert!(!c.is_running());
    }

    #[test]
    fn idle_controller_does_nothing() {
        let rig = rig();
        let c = Controller::new(tuning(1.0, 1.0));
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(1), 0);
        let report = c.step(&rig.frame, &rig.matcher, &rig.geometry, &mut d).unwrap();
        assert_eq!(report, StepReport::default());
        assert!(rig.platform.clicks().lock().unwrap().is_empty());
    }

    #[test]
    fn certain_sun_is_clicked_every_frame() {
        let rig = rig();
        let mut c = Controller::new(tuning(1.0, 0.0));
        c.start();
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(3), 0);
        let expected = screen_center(&rig.geometry, 50, 50, 20, 20);

        for _ in 0..20 {
            let report = c.step(&rig.frame, &rig.matcher, &rig.geometry, &mut d).unwrap();
            assert_eq!(report.clicks, vec![expected]);
            assert_eq!(report.detections.len(), 1);
        }
        assert_eq!(rig.platform.clicks().lock().unwrap().len(), 20);
    }

    #[test]
    fn zero_chance_sun_is_never_clicked() {
        let rig = rig();
        let mut c = Controller::new(tuning(0.0, 0.0));
        c.start();
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(3), 0);

        for _ in 0..20 {
            let report = c.step(&rig.frame, &rig.matcher, &rig.geometry, &mut d).unwrap();
            assert!(report.clicks.is_empty());
            assert_eq!(report.detections[0].name, SUN);
        }
        assert!(rig.platform.clicks().lock().unwrap().is_empty());
    }

    #[test]
    fn planting_clicks_seed_then_lawn() {
        let rig = rig();
        let mut c = Controller::new(tuning(0.0, 1.0));
        c.start();
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(5), 0);

        let report = c.step(&rig.frame, &rig.matcher, &rig.geometry, &mut d).unwrap();
        assert_eq!(
            report.clicks,
            vec![
                screen_center(&rig.geometry, 200, 20, 24, 16),
                screen_center(&rig.geometry, 120, 150, 30, 30),
            ]
        );
        let names: Vec<_> = report.detections.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, [SUN, SEED, LAWN]);
    }

    #[test]
    fn weak_best_match_is_skipped_when_min_score_is_set() {
        let rig = rig();
        // Nothing like this sprite is in the frame
        sprite(20, 20, 45).save(rig.matcher.template_path(SUN)).unwrap();
        let mut c = Controller::new(Tuning { min_score: 0.99999, ..tuning(1.0, 0.0) });
        c.start();
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(5), 0);

        let report = c.step(&rig.frame, &rig.matcher, &rig.geometry, &mut d).unwrap();
        assert!(report.clicks.is_empty());
    }

    #[test]
    fn collect_all_suns_clicks_each_hit() {
        let rig = rig();
        let mut frame = rig.frame.clone();
        image::imageops::replace(&mut frame, &sprite(20, 20, 0), 260, 180);
        let mut c = Controller::new(Tuning {
            collect_all_suns: true,
            sun_threshold: 0.9999,
            ..tuning(1.0, 0.0)
        });
        c.start();
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(9), 0);

        let report = c.step(&frame, &rig.matcher, &rig.geometry, &mut d).unwrap();
        assert!(report.clicks.contains(&screen_center(&rig.geometry, 50, 50, 20, 20)));
        assert!(report.clicks.contains(&screen_center(&rig.geometry, 260, 180, 20, 20)));
        assert_eq!(report.clicks.len(), report.detections.len());
    }

    #[test]
    fn collect_all_suns_leaves_a_sunless_frame_alone() {
        let rig = rig();
        let mut frame = background(320, 240);
        image::imageops::replace(&mut frame, &sprite(24, 16, 90), 200, 20);
        let mut c = Controller::new(Tuning { collect_all_suns: true, ..tuning(1.0, 0.0) });
        assert_eq!(c.tuning().sun_threshold, 0.8);
        c.start();
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(2), 0);

        let report = c.step(&frame, &rig.matcher, &rig.geometry, &mut d).unwrap();
        assert!(report.clicks.is_empty());
        assert!(rig.platform.clicks().lock().unwrap().is_empty());
    }

    #[test]
    fn missing_template_stops_the_step() {
        let rig = rig();
        std::fs::remove_file(rig.matcher.template_path(SUN)).unwrap();
        let mut c = Controller::new(tuning(1.0, 0.0));
        c.start();
        let mut d = Dispatcher::new(rig.platform.pointer(), StdRng::seed_from_u64(1), 0);
        let err = c.step(&rig.frame, &rig.matcher, &rig.geometry, &mut d).unwrap_err();
        assert!(matches!(err, crate::Error::TemplateLoad { .. }));
    }
}
