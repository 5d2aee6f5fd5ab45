//! In-process automation driver.
//!
//! [`Pilot`] implements [`Driver`] against a live [`Application`] borrowed
//! for the duration of a replay. Every synthetic event goes through the same
//! observer seam as genuine input, so an attached [`EventCapture`] sees it
//! (and, while replaying, suppresses it).
//!
//! [`EventCapture`]: crate::capture::EventCapture

use crate::capture::CaptureOutcome;
use crate::error::{RecorderError, RecorderResult};
use crate::observer::{EventObserver, dispatch};
use async_trait::async_trait;
use pilot_core::{
    Application, Driver, DriverError, DriverResult, InputEvent, KeyEvent, Modifiers, MouseButton,
    Offset, PointerAction, Region, WidgetHandle,
};
use std::time::Duration;

/// Drives a live application on behalf of replay.
pub struct Pilot<'a> {
    app: &'a mut dyn Application,
    observer: Option<&'a mut dyn EventObserver>,
    settle_yields: u32,
    outcomes: Vec<CaptureOutcome>,
    observer_error: Option<RecorderError>,
}

impl<'a> Pilot<'a> {
    /// Creates a driver for `app` with no observer attached.
    pub fn new(app: &'a mut dyn Application) -> Self {
        Self {
            app,
            observer: None,
            settle_yields: 1,
            outcomes: Vec::new(),
            observer_error: None,
        }
    }

    /// Builder: route every synthetic event through `observer`.
    pub fn with_observer(mut self, observer: &'a mut dyn EventObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builder: cooperative yields performed by each settle.
    pub fn with_settle_yields(mut self, yields: u32) -> Self {
        self.settle_yields = yields.max(1);
        self
    }

    /// Observer outcomes for every event sent so far.
    pub fn outcomes(&self) -> &[CaptureOutcome] {
        &self.outcomes
    }

    /// Ends the drive, reporting the first observer failure if there was one.
    pub fn finish(self) -> RecorderResult<Vec<CaptureOutcome>> {
        match self.observer_error {
            Some(e) => Err(e),
            None => Ok(self.outcomes),
        }
    }

    fn ensure_running(&self) -> DriverResult<()> {
        if self.app.is_running() {
            Ok(())
        } else {
            Err(DriverError::NotRunning)
        }
    }

    fn send(&mut self, event: InputEvent) {
        tracing::trace!(event = %event, "Sending synthetic event");
        let observer = self.observer.as_deref_mut();
        match dispatch(&mut *self.app, &event, observer) {
            Ok(outcome) => self.outcomes.push(outcome),
            Err(e) => {
                tracing::warn!(event = %event, error = %e, "Observer failed on synthetic event");
                self.observer_error.get_or_insert(e);
            }
        }
    }
}

#[async_trait(?Send)]
impl Driver for Pilot<'_> {
    async fn click(
        &mut self,
        selector: Option<&str>,
        offset: Offset,
        modifiers: Modifiers,
    ) -> DriverResult<()> {
        self.ensure_running()?;
        let position = match selector {
            Some(selector) => {
                let widget = self
                    .app
                    .tree()
                    .query_one(selector)?
                    .ok_or_else(|| DriverError::NoMatches(selector.to_string()))?;
                self.region(widget)?.origin() + offset
            }
            None => offset,
        };

        self.send(InputEvent::MouseDown {
            position,
            button: MouseButton::Left,
            modifiers,
        });
        self.send(InputEvent::MouseUp {
            position,
            button: MouseButton::Left,
            modifiers,
        });
        self.pause(None).await
    }

    async fn press(&mut self, key: &str) -> DriverResult<()> {
        self.ensure_running()?;
        let key = KeyEvent::parse(key).map_err(|_| DriverError::UnknownKey(key.to_string()))?;
        self.send(InputEvent::Key { key });
        self.pause(None).await
    }

    async fn pointer(
        &mut self,
        action: PointerAction,
        position: Offset,
        modifiers: Modifiers,
    ) -> DriverResult<()> {
        self.ensure_running()?;
        let event = match action {
            PointerAction::Down(button) => InputEvent::MouseDown {
                position,
                button,
                modifiers,
            },
            PointerAction::Move => InputEvent::MouseMove {
                position,
                modifiers,
            },
            PointerAction::Up(button) => InputEvent::MouseUp {
                position,
                button,
                modifiers,
            },
        };
        self.send(event);
        self.pause(None).await
    }

    async fn pause(&mut self, duration: Option<Duration>) -> DriverResult<()> {
        for _ in 0..self.settle_yields {
            self.app.settle();
            tokio::task::yield_now().await;
        }
        if let Some(duration) = duration {
            tokio::time::sleep(duration).await;
            self.app.settle();
        }
        Ok(())
    }

    fn query(&self, selector: &str) -> DriverResult<Vec<WidgetHandle>> {
        Ok(self.app.tree().query(selector)?)
    }

    fn region(&self, widget: WidgetHandle) -> DriverResult<Region> {
        self.app
            .tree()
            .region(widget)
            .ok_or(DriverError::WidgetGone(widget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::EventCapture;
    use pilot_core::Size;
    use pilot_harness::{Activation, HeadlessApp, Layout, PressAction, WidgetLayout};
    use pretty_assertions::assert_eq;

    fn app() -> HeadlessApp {
        let mut ok = WidgetLayout::new("Button");
        ok.id = Some("ok".to_string());
        ok.region = Region::new(10, 5, 8, 3);
        ok.on_press.push(PressAction::Remove {
            selector: "#ok".to_string(),
        });
        let mut other = WidgetLayout::new("Button");
        other.region = Region::new(30, 5, 8, 3);
        HeadlessApp::from_layout(&Layout::new(Size::new(80, 24)).with_widget(ok).with_widget(other))
            .unwrap()
    }

    #[tokio::test]
    async fn test_click_selector_and_settle() {
        let mut app = app();
        {
            let mut pilot = Pilot::new(&mut app);
            pilot
                .click(Some("#ok"), Offset::new(1, 1), Modifiers::empty())
                .await
                .unwrap();
        }
        assert_eq!(
            app.activity(),
            &[
                Activation::Down {
                    target: "Button#ok".to_string(),
                    button: MouseButton::Left
                },
                Activation::Up {
                    target: "Button#ok".to_string()
                },
            ]
        );
        // The press action ran during the pause after the click.
        assert!(app.dom().find_by_id("ok").is_none());
    }

    fn canvas() -> HeadlessApp {
        let mut canvas = WidgetLayout::new("Canvas");
        canvas.region = Region::new(5, 2, 30, 10);
        HeadlessApp::from_layout(&Layout::new(Size::new(80, 24)).with_widget(canvas)).unwrap()
    }

    #[tokio::test]
    async fn test_drag_across_widget() {
        let mut app = canvas();
        let mut capture = EventCapture::default();
        let outcomes = {
            let mut pilot = Pilot::new(&mut app).with_observer(&mut capture);
            pilot
                .drag(
                    "Canvas",
                    &[Offset::new(1, 1), Offset::new(3, 1), Offset::new(6, 4)],
                    Modifiers::SHIFT,
                )
                .await
                .unwrap();
            pilot.finish().unwrap()
        };

        let target = "Screen/Canvas[0]".to_string();
        assert_eq!(
            app.activity(),
            &[
                Activation::Down {
                    target: target.clone(),
                    button: MouseButton::Left
                },
                Activation::Hover {
                    target: target.clone()
                },
                Activation::Up { target },
            ]
        );

        // Every pointer event of the drag is captured, relative to the canvas.
        assert_eq!(outcomes.len(), 4);
        let offsets: Vec<_> = capture.log().iter().map(|step| step.offset).collect();
        assert_eq!(
            offsets,
            vec![
                Some(Offset::new(1, 1)),
                Some(Offset::new(3, 1)),
                Some(Offset::new(6, 4)),
                Some(Offset::new(6, 4)),
            ]
        );
        assert!(
            capture
                .log()
                .iter()
                .all(|step| step.event.modifiers() == Modifiers::SHIFT)
        );
    }

    #[tokio::test]
    async fn test_pointer_after_exit() {
        let mut app = canvas();
        app.exit();
        app.settle();
        let mut pilot = Pilot::new(&mut app);
        let err = pilot
            .pointer(PointerAction::Move, Offset::ZERO, Modifiers::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NotRunning));
    }

    #[tokio::test]
    async fn test_click_missing_selector() {
        let mut app = app();
        let mut pilot = Pilot::new(&mut app);
        let err = pilot
            .click(Some("#nope"), Offset::ZERO, Modifiers::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NoMatches(_)));
    }

    #[tokio::test]
    async fn test_click_by_index() {
        let mut app = app();
        {
            let mut pilot = Pilot::new(&mut app);
            pilot
                .click_by_index("Button", 1, Offset::new(2, 0), Modifiers::empty())
                .await
                .unwrap();
            let err = pilot
                .click_by_index("Button", 5, Offset::ZERO, Modifiers::empty())
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                DriverError::IndexOutOfRange {
                    index: 5,
                    count: 2,
                    ..
                }
            ));
        }
        assert!(matches!(
            &app.activity()[0],
            Activation::Down { target, .. } if target == "Screen/Button[1]"
        ));
    }

    #[tokio::test]
    async fn test_press_unknown_key() {
        let mut app = app();
        let mut pilot = Pilot::new(&mut app);
        assert!(matches!(
            pilot.press("hyper+q").await,
            Err(DriverError::UnknownKey(_))
        ));
        pilot.press("enter").await.unwrap();
    }

    #[tokio::test]
    async fn test_stopped_app() {
        let mut app = app();
        app.exit();
        app.settle();
        let mut pilot = Pilot::new(&mut app);
        assert!(matches!(
            pilot.press("a").await,
            Err(DriverError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_observer_sees_synthetic_events() {
        let mut app = app();
        let mut capture = EventCapture::default();
        {
            let mut pilot = Pilot::new(&mut app).with_observer(&mut capture);
            pilot.press("x").await.unwrap();
            let outcomes = pilot.finish().unwrap();
            assert_eq!(outcomes, vec![CaptureOutcome::Recorded]);
        }
        assert_eq!(capture.log().len(), 1);
    }
}
