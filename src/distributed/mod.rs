//! Driver/observer session over TCP
//!
//! # Architecture
//!
//! - **Driver**: listens, creates and deletes files in its view of the shared
//!   directory, announces each operation and waits for the acknowledgement
//! - **Observer**: connects, polls its own view of the directory until each
//!   announced operation is visible, measures the delay, acknowledges
//!
//! # Modules
//!
//! - `protocol`: event definitions and length-prefixed framing
//! - `driver`: accept loop and per-connection session
//! - `observer`: detection polling and session loop

pub mod driver;
pub mod observer;
pub mod protocol;

pub use driver::{Driver, DriverSession, DriverSettings, SessionSummary};
pub use observer::{connect, Observer, ObserverReport};
pub use protocol::{read_event, write_event, Event, EventKind};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::distribution::{SizeTable, SizeWeight};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    async fn start_driver(dir: &Path, num_files: usize, sizes: SizeTable) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let driver = Driver::new(DriverSettings {
            target_dir: dir.to_path_buf(),
            num_files,
            sizes,
            jitter_max: Duration::from_millis(5),
        });
        tokio::spawn(driver.serve(listener));
        address
    }

    fn detection() -> DetectionConfig {
        DetectionConfig {
            create_timeout_ms: 5_000,
            delete_timeout_ms: 5_000,
            ..DetectionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_loopback_session() {
        let dir = TempDir::new().unwrap();
        let sizes = SizeTable::new(vec![
            SizeWeight { bytes: 4096, weight: 0.5 },
            SizeWeight { bytes: 65536, weight: 0.5 },
        ]);
        let address = start_driver(dir.path(), 4, sizes).await;

        let stream = connect(&address).await.unwrap();
        let observer = Observer::new(dir.path(), detection());
        let mut report = ObserverReport::default();
        observer.run_session(stream, &mut report).await.unwrap();

        assert!(report.completed);
        assert_eq!(report.created.len(), 4);
        assert_eq!(report.deleted.len(), 4);
        assert_eq!(report.timeouts, 0);
        assert_eq!(report.created.iter().filter(|r| r.byte_size == 4096).count(), 2);
        assert_eq!(report.created.iter().filter(|r| r.byte_size == 65536).count(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_loopback_default_table_truncates() {
        let dir = TempDir::new().unwrap();
        let address = start_driver(dir.path(), 4, SizeTable::default()).await;

        let stream = connect(&address).await.unwrap();
        let observer = Observer::new(dir.path(), detection());
        let mut report = ObserverReport::default();
        observer.run_session(stream, &mut report).await.unwrap();

        // floor(0.70 * 4) = 2 files of the smallest size, none of the rest
        assert_eq!(report.created.len(), 2);
        assert!(report.created.iter().all(|r| r.byte_size == 128_000));
    }

    #[tokio::test]
    async fn test_driver_serves_sequential_observers() {
        let dir = TempDir::new().unwrap();
        let sizes = SizeTable::new(vec![SizeWeight { bytes: 100, weight: 1.0 }]);
        let address = start_driver(dir.path(), 2, sizes).await;

        for _ in 0..2 {
            let stream = connect(&address).await.unwrap();
            let mut report = ObserverReport::default();
            Observer::new(dir.path(), detection())
                .run_session(stream, &mut report)
                .await
                .unwrap();
            assert_eq!(report.created.len(), 2);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_driver_serves_concurrent_observers() {
        let dir = TempDir::new().unwrap();
        let sizes = SizeTable::new(vec![
            SizeWeight { bytes: 1000, weight: 0.5 },
            SizeWeight { bytes: 3000, weight: 0.5 },
        ]);
        let address = start_driver(dir.path(), 10, sizes).await;

        let mut sessions = Vec::new();
        for _ in 0..3 {
            let address = address.clone();
            let target = dir.path().to_path_buf();
            sessions.push(tokio::spawn(async move {
                let stream = connect(&address).await.unwrap();
                let mut report = ObserverReport::default();
                let result = Observer::new(target, detection())
                    .run_session(stream, &mut report)
                    .await;
                (result, report)
            }));
        }

        for session in sessions {
            let (result, report) = session.await.unwrap();
            result.unwrap();
            assert!(report.completed);
            assert_eq!(report.created.len(), 10);
            assert_eq!(report.deleted.len(), 10);
            assert_eq!(report.timeouts, 0);
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(connect(&address).await.is_err());
    }
}
