/// Events emitted while a context advances through a batch of steps.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    StepsStart { total_steps: u64 },
    /// `step` is the context's step counter after the completed step.
    StepCompleted { step: u64, time: f64 },
    StepsFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.callback.is_none()
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_forwards_events_to_callback() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        reporter.report(Progress::StepsStart { total_steps: 2 });
        reporter.report(Progress::StepsFinish);
        drop(reporter);

        assert_eq!(
            events.into_inner().unwrap(),
            vec![Progress::StepsStart { total_steps: 2 }, Progress::StepsFinish]
        );
    }

    #[test]
    fn default_reporter_is_silent() {
        let reporter = ProgressReporter::new();
        assert!(reporter.is_silent());
        reporter.report(Progress::Message("ignored".to_string()));
    }
}
