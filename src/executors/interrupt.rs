// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Interrupt listener
//!
//! One listener is installed for the lifetime of the process. Once raised the
//! signal stays raised, so a Ctrl-C that lands between two steps still stops
//! the next one.

use tokio::sync::watch;
use tracing::warn;

/// Sticky interrupt flag shared by everything that spawns processes
#[derive(Debug, Clone)]
pub struct InterruptSignal {
    rx: watch::Receiver<bool>,
}

/// Raises an [`InterruptSignal`] by hand
#[derive(Debug)]
pub struct InterruptTrigger {
    tx: watch::Sender<bool>,
}

impl InterruptTrigger {
    pub fn raise(&self) {
        self.tx.send_replace(true);
    }
}

impl InterruptSignal {
    /// Listen for SIGINT / Ctrl-C
    ///
    /// The handler is registered before this returns; from then on the
    /// default terminate action no longer applies.
    pub fn ctrl_c() -> std::io::Result<Self> {
        let (tx, rx) = watch::channel(false);

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut interrupts = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                while interrupts.recv().await.is_some() {
                    warn!("interrupt received");
                    tx.send_replace(true);
                }
            });
        }

        #[cfg(not(unix))]
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received");
                tx.send_replace(true);
            }
        });

        Ok(Self { rx })
    }

    /// A signal raised only through the returned trigger
    pub fn manual() -> (InterruptTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (InterruptTrigger { tx }, Self { rx })
    }

    pub fn is_raised(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised; never, if it cannot be anymore
    pub async fn raised(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|raised| *raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
