use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vigil_core::incident::IncidentStore;
use vigil_core::{
    EventType, PipelineConfig, RawEvent, RecordingNotifier, Severity, TriageService, VigilError,
};

/// Helper: a fast pipeline rooted in `dir`.
///
/// Temp directories live under `/tmp`, which the default excludes drop, so
/// the tests only exclude log files.
fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        roots: vec![dir.to_path_buf()],
        exclude: vec!["**/*.log".to_string()],
        batch_interval_ms: 150,
        retry_delay_ms: 10,
        quarantine_dir: dir.join("quarantine"),
        incident_db: dir.join("incidents.db"),
        ..PipelineConfig::default()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(600)).await;
}

#[tokio::test]
async fn invoice_pdf_yields_one_high_notification() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let downloads = tmpdir.path().join("Downloads");
    fs::create_dir_all(&downloads)?;
    let invoice = downloads.join("invoice_final.pdf");
    fs::write(&invoice, b"%PDF-1.7")?;

    let notifier = RecordingNotifier::new();
    let mut service = TriageService::create(config(tmpdir.path()), Arc::new(notifier.clone())).await?;
    let tx = service.run_detached()?;

    tx.send(RawEvent::new(EventType::Created, &invoice))
        .map_err(|e| VigilError::Other(e.to_string()))?;
    settle().await;

    let sent = notifier.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].severity, Severity::High);
    assert!(sent[0].message.contains("invoice_final.pdf"));
    assert!(sent[0].message.contains("(8 bytes)"));

    let stats = service.stats();
    assert_eq!(stats.admitted, 1);
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.quarantined, 0);
    assert!(invoice.exists());

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn executable_in_downloads_is_quarantined() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let downloads = tmpdir.path().join("Downloads");
    fs::create_dir_all(&downloads)?;
    let exe = downloads.join("update.exe");
    fs::write(&exe, b"MZ")?;

    let notifier = RecordingNotifier::new();
    let cfg = config(tmpdir.path());
    let db = cfg.incident_db.clone();
    let mut service = TriageService::create(cfg, Arc::new(notifier.clone())).await?;
    let tx = service.run_detached()?;

    tx.send(RawEvent::new(EventType::Created, &exe))
        .map_err(|e| VigilError::Other(e.to_string()))?;
    settle().await;
    service.shutdown().await?;

    assert!(!exe.exists());
    assert_eq!(notifier.notifications()[0].severity, Severity::Critical);
    assert_eq!(service.stats().quarantined, 1);

    let reports = IncidentStore::open(&db, Duration::ZERO).await?.list().await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].original_path, exe);
    assert!(reports[0].quarantine_path.exists());
    assert_eq!(reports[0].file_size, 2);
    Ok(())
}

#[tokio::test]
async fn events_inside_quarantine_dir_are_ignored() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let notifier = RecordingNotifier::new();
    let cfg = config(tmpdir.path());
    let quarantined = cfg.quarantine_dir.join("20260101T000000000Z_password_stealer.exe");
    let journal = tmpdir.path().join("incidents.db-journal");
    let mut service = TriageService::create(cfg, Arc::new(notifier.clone())).await?;
    let tx = service.run_detached()?;

    for path in [&quarantined, &journal] {
        tx.send(RawEvent::new(EventType::Created, path))
            .map_err(|e| VigilError::Other(e.to_string()))?;
    }
    settle().await;
    service.shutdown().await?;

    let stats = service.stats();
    assert_eq!(stats.filtered, 2);
    assert_eq!(stats.admitted, 0);
    assert_eq!(stats.batches, 0);
    assert_eq!(stats.quarantined, 0);
    assert!(notifier.notifications().is_empty());
    Ok(())
}

#[tokio::test]
async fn shutdown_flushes_pending_batch() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let notifier = RecordingNotifier::new();
    let cfg = PipelineConfig {
        batch_interval_ms: 60_000,
        ..config(tmpdir.path())
    };
    let mut service = TriageService::create(cfg, Arc::new(notifier.clone())).await?;
    let tx = service.run_detached()?;

    for name in ["a.pdf", "b.pdf"] {
        tx.send(RawEvent::new(EventType::Created, tmpdir.path().join(name)))
            .map_err(|e| VigilError::Other(e.to_string()))?;
    }

    service.shutdown().await?;

    let sent = notifier.notifications();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].message.contains("a.pdf"));
    assert!(sent[1].message.contains("b.pdf"));
    Ok(())
}

#[tokio::test]
async fn duplicates_filtered_and_rate_limited_events_are_dropped() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let notifier = RecordingNotifier::new();
    let cfg = PipelineConfig {
        rate_limit_per_minute: 3,
        auto_quarantine: false,
        ..config(tmpdir.path())
    };
    let mut service = TriageService::create(cfg, Arc::new(notifier.clone())).await?;
    let tx = service.run_detached()?;

    let send = |event: RawEvent| {
        tx.send(event)
            .map_err(|e| VigilError::Other(e.to_string()))
    };

    let doc = tmpdir.path().join("doc.pdf");
    send(RawEvent::new(EventType::Modified, &doc))?;
    send(RawEvent::new(EventType::Modified, &doc))?;
    send(RawEvent::new(EventType::Created, tmpdir.path().join("debug.log")))?;
    send(RawEvent::new(EventType::Created, tmpdir.path().join("one.pdf")))?;
    send(RawEvent::new(EventType::Created, tmpdir.path().join("two.pdf")))?;
    send(RawEvent::new(EventType::Created, tmpdir.path().join("three.pdf")))?;

    service.shutdown().await?;

    let stats = service.stats();
    assert_eq!(stats.received, 6);
    assert_eq!(stats.filtered, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.rate_limited, 2);
    assert_eq!(stats.admitted, 2);
    assert_eq!(notifier.notifications().len(), 2);
    Ok(())
}

#[tokio::test]
async fn running_twice_is_rejected() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let mut service = TriageService::create(config(tmpdir.path()), Arc::new(RecordingNotifier::new())).await?;

    let _tx = service.run_detached()?;
    assert!(service.run_detached().is_err());

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn missing_roots_fail_to_start() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let cfg = PipelineConfig {
        roots: vec![tmpdir.path().join("does-not-exist")],
        ..config(tmpdir.path())
    };
    let mut service = TriageService::create(cfg, Arc::new(RecordingNotifier::new())).await?;

    assert!(matches!(service.run(), Err(VigilError::NoRoots)));
    service.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn os_watcher_feeds_the_pipeline() -> Result<(), VigilError> {
    let tmpdir = TempDir::new()?;
    let root = tmpdir.path().join("watched");
    fs::create_dir_all(&root)?;

    let notifier = RecordingNotifier::new();
    let cfg = PipelineConfig {
        roots: vec![root.clone()],
        auto_quarantine: false,
        ..config(tmpdir.path())
    };
    let mut service = TriageService::create(cfg, Arc::new(notifier.clone())).await?;
    service.run()?;

    // Give the backend a moment to register the watch.
    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(root.join("quarterly_report.pdf"), b"%PDF")?;

    let mut seen = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if notifier
            .notifications()
            .iter()
            .any(|n| n.message.contains("quarterly_report.pdf"))
        {
            seen = true;
            break;
        }
    }

    service.shutdown().await?;
    assert!(seen, "watcher event should reach the notifier");
    Ok(())
}
