/*
 *  render/queue.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  FIFO render queue and its single consumer, the only display writer
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use log::{debug, error, info};

use crate::display::{CharBus, CharDisplay, DisplayError};

pub type JobFn<B> = Box<dyn FnOnce(&mut CharDisplay<B>) -> Result<(), DisplayError> + Send>;

/// One unit of display work
pub struct RenderJob<B: CharBus> {
    name: &'static str,
    run: JobFn<B>,
}

impl<B: CharBus> RenderJob<B> {
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: FnOnce(&mut CharDisplay<B>) -> Result<(), DisplayError> + Send + 'static,
    {
        Self { name, run: Box::new(run) }
    }
}

/// Producer side; cheap to clone and safe to use from any thread.
pub struct RenderQueue<B: CharBus> {
    jobs: Sender<RenderJob<B>>,
    shutdown: Sender<()>,
}

impl<B: CharBus> Clone for RenderQueue<B> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<B: CharBus> RenderQueue<B> {
    /// Enqueue a job; false once the consumer is gone.
    pub fn submit<F>(&self, name: &'static str, run: F) -> bool
    where
        F: FnOnce(&mut CharDisplay<B>) -> Result<(), DisplayError> + Send + 'static,
    {
        self.jobs.send(RenderJob::new(name, run)).is_ok()
    }

    /// Jobs waiting to run
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    /// Stop the consumer; queued jobs are abandoned.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

/// Consumer side; owns the display for its whole life.
pub struct RenderConsumer<B: CharBus> {
    display: CharDisplay<B>,
    jobs: Receiver<RenderJob<B>>,
    shutdown: Receiver<()>,
    // keeps the shutdown channel connected after every producer is dropped
    _shutdown_tx: Sender<()>,
    completed: u64,
    failed: u64,
}

/// Build a queue around `display`
pub fn render_queue<B: CharBus>(display: CharDisplay<B>) -> (RenderQueue<B>, RenderConsumer<B>) {
    let (jobs_tx, jobs_rx) = unbounded();
    let (stop_tx, stop_rx) = unbounded();
    (
        RenderQueue { jobs: jobs_tx, shutdown: stop_tx.clone() },
        RenderConsumer {
            display,
            jobs: jobs_rx,
            shutdown: stop_rx,
            _shutdown_tx: stop_tx,
            completed: 0,
            failed: 0,
        },
    )
}

impl<B: CharBus> RenderConsumer<B> {
    pub fn display(&self) -> &CharDisplay<B> {
        &self.display
    }

    /// (completed, failed) job counts
    pub fn stats(&self) -> (u64, u64) {
        (self.completed, self.failed)
    }

    /// Run jobs until shutdown, or until every producer is dropped and the
    /// queue is empty, then power the display on and hand it back.
    pub fn run(mut self) -> CharDisplay<B> {
        info!("Render consumer started");
        loop {
            select! {
                recv(self.shutdown) -> _ => break,
                recv(self.jobs) -> msg => match msg {
                    Ok(job) => {
                        if self.shutdown_requested() {
                            break;
                        }
                        self.execute(job);
                    }
                    Err(_) => break,
                },
            }
        }
        self.finish()
    }

    /// Run on a named thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<CharDisplay<B>>>
    where
        B: 'static,
    {
        thread::Builder::new()
            .name("panel-render".into())
            .spawn(move || self.run())
    }

    /// Run whatever is queued right now without blocking; returns jobs run.
    pub fn drain_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(job) = self.jobs.try_recv() {
            self.execute(job);
            count += 1;
        }
        count
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.try_recv().is_ok()
    }

    fn execute(&mut self, job: RenderJob<B>) {
        let RenderJob { name, run } = job;
        let display = &mut self.display;
        match panic::catch_unwind(AssertUnwindSafe(move || run(display))) {
            Ok(Ok(())) => {
                self.completed += 1;
            }
            Ok(Err(e)) => {
                self.failed += 1;
                error!("Render job '{}' failed: {}", name, e);
            }
            Err(_) => {
                self.failed += 1;
                error!("Render job '{}' panicked", name);
            }
        }
    }

    fn finish(mut self) -> CharDisplay<B> {
        let abandoned = self.jobs.len();
        info!(
            "Render consumer stopping: {} done, {} failed, {} abandoned",
            self.completed, self.failed, abandoned
        );
        // never leave the panel dark behind us
        if let Err(e) = self.display.power_on() {
            error!("Final power on failed: {}", e);
        } else {
            debug!("Display powered on for exit");
        }
        self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockBus;
    use std::sync::{Arc, Mutex};

    fn setup() -> (RenderQueue<MockBus>, RenderConsumer<MockBus>, MockBus) {
        let bus = MockBus::new();
        let display = CharDisplay::new(bus.clone(), &[0x00, 0x20], 16);
        let (queue, consumer) = render_queue(display);
        (queue, consumer, bus)
    }

    #[test]
    fn test_jobs_run_in_submission_order() {
        let (queue, mut consumer, _) = setup();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = Arc::clone(&order);
            queue.submit("push", move |_| {
                order.lock().unwrap().push(i);
                Ok(())
            });
        }
        assert_eq!(queue.pending(), 5);
        assert_eq!(consumer.drain_pending(), 5);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_failed_and_panicking_jobs_do_not_stop_pipeline() {
        let (queue, mut consumer, _) = setup();
        queue.submit("bad line", |d| d.write_line("x", 9));
        queue.submit("boom", |_| panic!("job blew up"));
        queue.submit("ok", |d| d.write_line("HELLO", 0));

        consumer.drain_pending();
        assert_eq!(consumer.stats(), (1, 2));
        assert_eq!(&consumer.display().line(0).unwrap().cached()[..5], b"HELLO");
    }

    #[test]
    fn test_shutdown_abandons_queue_and_powers_on() {
        let (queue, consumer, bus) = setup();
        let ran = Arc::new(Mutex::new(false));
        {
            let ran = Arc::clone(&ran);
            queue.submit("late", move |_| {
                *ran.lock().unwrap() = true;
                Ok(())
            });
        }
        queue.shutdown();

        let display = consumer.run();
        assert!(!*ran.lock().unwrap());
        assert!(display.is_on());
        assert!(bus.ops().contains(&crate::display::drivers::mock::BusOp::Command(0x0c)));
    }

    #[test]
    fn test_consumer_thread_drains_then_stops() {
        let (queue, consumer, _) = setup();
        let handle = consumer.spawn().unwrap();
        queue.submit("title", |d| d.write_line("PLAYING", 1));
        // dropping the last producer lets the consumer finish what is queued
        drop(queue);
        let display = handle.join().unwrap();
        assert_eq!(&display.line(1).unwrap().cached()[..7], b"PLAYING");
    }

    #[test]
    fn test_submit_after_consumer_gone() {
        let (queue, consumer, _) = setup();
        drop(consumer);
        assert!(!queue.submit("noop", |_| Ok(())));
    }
}
