use log::warn;
use std::sync::mpsc;

pub enum TaskStatus {
    /// Task name and its completion percentage in [0, 100]
    TaskPercentage(String, f64),
}

/// What the worker sends to whichever context renders progress. A `None`
/// status means no task is running.
#[derive(Default)]
pub struct TaskStatusContainer {
    pub status: Option<TaskStatus>,
}

/// Anything able to carry task status updates off the worker thread
pub trait StatusSender {
    fn send_status(&self, status: TaskStatusContainer);
}

impl StatusSender for mpsc::Sender<TaskStatusContainer> {
    fn send_status(&self, status: TaskStatusContainer) {
        if self.send(status).is_err() {
            warn!("Task status receiver has gone away");
        }
    }
}

#[cfg(feature = "gui")]
impl StatusSender for gtk::glib::Sender<TaskStatusContainer> {
    fn send_status(&self, status: TaskStatusContainer) {
        if self.send(status).is_err() {
            warn!("Task status receiver has gone away");
        }
    }
}

pub fn set_task_status<S: StatusSender + ?Sized>(sender: &S, task_name: &str, percent: f64) {
    sender.send_status(TaskStatusContainer {
        status: Some(TaskStatus::TaskPercentage(task_name.to_owned(), percent)),
    });
}

pub fn set_task_completed<S: StatusSender + ?Sized>(sender: &S) {
    sender.send_status(TaskStatusContainer { status: None });
}

/// Receives the completion percentage of a running transform.
///
/// Called on the thread doing the work. Implementations that render
/// somewhere else must hand the value over without blocking for long.
pub trait ProgressSink {
    fn report(&mut self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: FnMut(f64),
{
    fn report(&mut self, percent: f64) {
        self(percent)
    }
}

/// Clamps reports into [0, 100] and drops any value lower than one
/// already passed through.
pub struct MonotonicSink<S> {
    inner: S,
    last: Option<f64>,
}

impl<S: ProgressSink> MonotonicSink<S> {
    pub fn new(inner: S) -> Self {
        MonotonicSink { inner, last: None }
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

impl<S: ProgressSink> ProgressSink for MonotonicSink<S> {
    fn report(&mut self, percent: f64) {
        if percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);
        if matches!(self.last, Some(last) if percent < last) {
            return;
        }
        self.last = Some(percent);
        self.inner.report(percent);
    }
}

/// Forwards progress as `TaskPercentage` updates under a fixed task name
pub struct StatusSink<S> {
    sender: S,
    task_name: String,
}

impl<S: StatusSender> StatusSink<S> {
    pub fn new(sender: S, task_name: &str) -> Self {
        StatusSink {
            sender,
            task_name: task_name.to_owned(),
        }
    }
}

impl<S: StatusSender> ProgressSink for StatusSink<S> {
    fn report(&mut self, percent: f64) {
        set_task_status(&self.sender, &self.task_name, percent);
    }
}
