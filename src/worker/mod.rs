//! Async measurement shim
//!
//! Backends block for as long as the measurement takes. [`measure_async`] moves
//! the backend call onto tokio's blocking pool and races it against the
//! cancellation signal, so a single-threaded caller stays responsive.
//!
//! Resolution rules:
//!
//! - Backend finishes first: its result is returned unchanged
//! - Signal fires first: the backend is aborted and `Canceled` is returned; any
//!   result the backend produces later is dropped
//! - Both ready on the same poll: the backend wins

use crate::config::MeasurementConfig;
use crate::engine::{Backend, CancelSignal, RawResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Run `backend` on a blocking thread and race it against `cancel`
pub async fn measure_async<B>(
    backend: Arc<B>,
    config: MeasurementConfig,
    cancel: CancelSignal,
) -> RawResult
where
    B: Backend + ?Sized + 'static,
{
    let name = backend.name();
    debug!(backend = name, %config, "Scheduling measurement");

    let task = {
        let backend = Arc::clone(&backend);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || backend.measure(&config, &cancel))
    };

    tokio::select! {
        biased;

        joined = task => match joined {
            Ok(result) => {
                debug!(backend = name, status = %result.status(), "Measurement finished");
                result
            }
            Err(e) => {
                error!(backend = name, error = %e, "Measurement task failed");
                RawResult::failure(format!("Measurement task failed: {}", e))
            }
        },

        _ = cancel.canceled() => {
            info!(backend = name, "Measurement canceled");
            backend.abort();
            RawResult::canceled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockBackend;
    use crate::engine::process::test_support::{spawn_lock, write_script};
    use crate::engine::process::ProcessBackend;
    use crate::engine::Status;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn canceled_after(cancel: &CancelSignal, delay: Duration) {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cancel.cancel();
        });
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let canned = RawResult::success(vec![104.8576; 4], 104.8576);
        let backend = Arc::new(MockBackend::new(canned.clone()));

        let result =
            measure_async(backend.clone(), MeasurementConfig::new(0), CancelSignal::new()).await;

        assert_eq!(result, canned);
        assert_eq!(backend.measure_calls(), 1);
        assert_eq!(backend.abort_calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_passes_through() {
        let backend = Arc::new(MockBackend::new(RawResult::failure("device gone")));

        let result = measure_async(backend, MeasurementConfig::new(0), CancelSignal::new()).await;

        assert_eq!(result.status(), Status::Failure);
        assert_eq!(result.message(), Some("device gone"));
    }

    #[tokio::test]
    async fn test_pre_canceled() {
        let backend = Arc::new(
            MockBackend::new(RawResult::success(vec![1.0], 1.0)).with_delay(Duration::from_secs(60)),
        );
        let cancel = CancelSignal::new();
        cancel.cancel();

        let result = measure_async(backend, MeasurementConfig::new(0), cancel).await;

        assert_eq!(result.status(), Status::Canceled);
        assert!(result.samples().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_aborts_backend() {
        let backend = Arc::new(
            MockBackend::new(RawResult::success(vec![1.0], 1.0))
                .with_delay(Duration::from_secs(60))
                .ignoring_cancel(),
        );
        let cancel = CancelSignal::new();
        canceled_after(&cancel, Duration::from_millis(50));

        let started = Instant::now();
        let result =
            measure_async(backend.clone(), MeasurementConfig::new(0), cancel.clone()).await;

        assert_eq!(result.status(), Status::Canceled);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(backend.abort_calls(), 1);

        // Already resolved
        assert!(!cancel.cancel());
        assert_eq!(backend.abort_calls(), 1);
    }

    #[tokio::test]
    async fn test_completed_backend_ignores_later_cancel() {
        let backend = Arc::new(MockBackend::new(RawResult::success(vec![5.0], 5.0)));
        let cancel = CancelSignal::new();

        let result =
            measure_async(backend.clone(), MeasurementConfig::new(0), cancel.clone()).await;
        assert!(cancel.cancel());

        assert!(result.is_success());
        assert_eq!(backend.abort_calls(), 0);
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let backend = Arc::new(MockBackend::new(RawResult::not_run()).panicking());

        let result = measure_async(backend, MeasurementConfig::new(0), CancelSignal::new()).await;

        assert_eq!(result.status(), Status::Failure);
        assert!(result.message().unwrap().starts_with("Measurement task failed"));
    }

    #[tokio::test]
    async fn test_dyn_backend() {
        let backend: Arc<dyn Backend> =
            Arc::new(MockBackend::new(RawResult::success(vec![2.0], 2.0)));

        let result = measure_async(backend, MeasurementConfig::new(0), CancelSignal::new()).await;
        assert_eq!(result.samples(), &[2.0]);
    }

    #[tokio::test]
    async fn test_cancel_terminates_helper() {
        let _guard = spawn_lock();
        let dir = TempDir::new().unwrap();
        let helper = write_script(dir.path(), "helper", "exec sleep 30");
        let backend = Arc::new(ProcessBackend::new(helper));
        let cancel = CancelSignal::new();

        let run = tokio::spawn(measure_async(
            backend.clone(),
            MeasurementConfig::new(0),
            cancel.clone(),
        ));

        let deadline = Instant::now() + Duration::from_secs(5);
        while backend.spawn_count() == 0 {
            assert!(Instant::now() < deadline, "helper never started");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("shim resolves promptly")
            .unwrap();
        assert_eq!(result.status(), Status::Canceled);
    }
}
