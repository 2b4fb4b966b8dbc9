use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use automix_common::error::{AutomixError, AutomixResult, ErrorKind, GENERIC_FAILURE_MESSAGE};
use automix_mix_engine::{
    AudioEngine, MixPipeline, PipelineSettings, ProgressCallback, RenderJob, RenderProgress,
};
use automix_mix_model::{MixRequest, Track};

/// How the scripted engine finishes a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderBehavior {
    /// Write the concatenated inputs to the output file.
    Succeed,
    /// Write part of the output, then report an engine error.
    FailAfterPartialWrite,
    /// Exit successfully without writing anything.
    WriteNothing,
    /// Exit successfully with an empty output file.
    WriteEmpty,
}

/// Engine whose probe reads `duration=<secs>` from the persisted file.
///
/// File contents `unreadable` fail the probe; anything else without a
/// duration line reports no duration.
struct ScriptedEngine {
    behavior: RenderBehavior,
    available: bool,
    jobs: Mutex<Vec<RenderJob>>,
    inputs_seen: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedEngine {
    fn new(behavior: RenderBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            available: true,
            jobs: Mutex::new(Vec::new()),
            inputs_seen: Mutex::new(Vec::new()),
        })
    }

    fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            behavior: RenderBehavior::Succeed,
            available: false,
            jobs: Mutex::new(Vec::new()),
            inputs_seen: Mutex::new(Vec::new()),
        })
    }

    fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl AudioEngine for ScriptedEngine {
    fn probe_duration(&self, path: &Path) -> AutomixResult<Option<f64>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AutomixError::Other(anyhow::anyhow!("cannot open {e}")))?;
        if content.trim() == "unreadable" {
            return Err(AutomixError::Other(anyhow::anyhow!(
                "Invalid data found when processing input"
            )));
        }
        Ok(content
            .lines()
            .find_map(|l| l.trim().strip_prefix("duration="))
            .and_then(|v| v.parse::<f64>().ok()))
    }

    fn render(&self, job: &RenderJob, progress: Option<ProgressCallback>) -> AutomixResult<()> {
        self.jobs.lock().unwrap().push(job.clone());

        let mut mixed = Vec::new();
        for input in &job.inputs {
            let bytes = std::fs::read(input)
                .map_err(|e| AutomixError::render(format!("Error opening input: {e}")))?;
            self.inputs_seen.lock().unwrap().push(bytes.clone());
            mixed.extend_from_slice(&bytes);
        }

        if let Some(cb) = &progress {
            cb(RenderProgress {
                progress: 1.0,
                out_time_secs: job.expected_duration_secs,
                eta_secs: 0.0,
                complete: true,
            });
        }

        match self.behavior {
            RenderBehavior::Succeed => {
                std::fs::write(&job.output_path, mixed).unwrap();
                Ok(())
            }
            RenderBehavior::FailAfterPartialWrite => {
                std::fs::write(&job.output_path, b"partial").unwrap();
                Err(AutomixError::render(
                    "Conversion failed! /tmp/private/path.mp3: Invalid argument",
                ))
            }
            RenderBehavior::WriteNothing => Ok(()),
            RenderBehavior::WriteEmpty => {
                std::fs::write(&job.output_path, b"").unwrap();
                Ok(())
            }
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn track(name: &str, secs: f64) -> Track {
    Track::from_bytes(name, format!("duration={secs}\n").into_bytes())
}

fn pipeline(engine: Arc<ScriptedEngine>, root: &Path) -> MixPipeline {
    MixPipeline::new(engine, PipelineSettings::with_root(root))
}

fn leftover_entries(root: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(root) {
        Ok(dir) => dir.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn three_equal_tracks_produce_two_step_chain() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    let request = MixRequest::new(
        vec![track("a.mp3", 20.0), track("b.mp3", 20.0), track("c.mp3", 20.0)],
        5,
    );
    let artifact = pipeline.run(request).await.unwrap();

    assert_eq!(artifact.content_type, "audio/mpeg");
    assert_eq!(artifact.file_name, "automix-session.mp3");
    assert_eq!(artifact.report.resolved_crossfade_secs, 5);
    assert!(!artifact.report.clamped);
    assert_eq!(artifact.report.durations.as_slice(), &[20.0, 20.0, 20.0]);
    assert!((artifact.report.expected_duration_secs - 50.0).abs() < 1e-9);
    assert_eq!(
        artifact.report.filter_graph,
        "[0:a][1:a]acrossfade=d=5:c1=tri:c2=tri[a1];[a1][2:a]acrossfade=d=5:c1=tri:c2=tri[out]"
    );

    let jobs = engine.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].output_label, "out");
    let names: Vec<String> = jobs[0]
        .inputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.mp3", "b.mp3", "c.mp3"]);

    assert_eq!(
        artifact.bytes,
        b"duration=20\nduration=20\nduration=20\n".to_vec()
    );
    assert!(leftover_entries(root.path()).is_empty());
}

#[tokio::test]
async fn reordered_tracks_reorder_the_chain() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    pipeline
        .run(MixRequest::new(
            vec![track("c.mp3", 30.0), track("a.mp3", 30.0), track("b.mp3", 30.0)],
            5,
        ))
        .await
        .unwrap();

    let jobs = engine.jobs();
    let names: Vec<String> = jobs[0]
        .inputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["c.mp3", "a.mp3", "b.mp3"]);
}

#[tokio::test]
async fn short_track_clamps_crossfade() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    let artifact = pipeline
        .run(MixRequest::new(vec![track("a.mp3", 6.0), track("b.mp3", 40.0)], 10))
        .await
        .unwrap();

    assert_eq!(artifact.report.requested_crossfade_secs, 10);
    assert_eq!(artifact.report.resolved_crossfade_secs, 5);
    assert!(artifact.report.clamped);
    assert!(engine.jobs()[0].filter_graph.contains("acrossfade=d=5:"));
}

#[tokio::test]
async fn missing_duration_degrades_to_hard_cut() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    let artifact = pipeline
        .run(MixRequest::new(
            vec![
                Track::from_bytes("silent.mp3", b"no duration here".to_vec()),
                track("b.mp3", 40.0),
            ],
            5,
        ))
        .await
        .unwrap();

    assert_eq!(artifact.report.durations.as_slice(), &[0.0, 40.0]);
    assert_eq!(artifact.report.resolved_crossfade_secs, 0);
    assert!(engine.jobs()[0].filter_graph.contains("acrossfade=d=0:"));
}

#[tokio::test]
async fn single_track_rejected_without_workspace() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    let err = pipeline
        .run(MixRequest::with_default_crossfade(vec![track("a.mp3", 30.0)]))
        .await
        .unwrap_err();

    assert!(matches!(err, AutomixError::InvalidRequest { .. }));
    assert_eq!(err.kind(), ErrorKind::ClientInput);
    assert_eq!(err.to_response().status, 400);
    assert!(leftover_entries(root.path()).is_empty());
    assert!(engine.jobs().is_empty());
}

#[tokio::test]
async fn single_track_rejected_before_workspace_root_exists() {
    let root = tempfile::TempDir::new().unwrap();
    let workspace_root = root.path().join("not-yet-created");
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(engine, &workspace_root);

    assert!(pipeline
        .run(MixRequest::new(vec![], 5))
        .await
        .is_err());
    assert!(!workspace_root.exists());
}

#[tokio::test]
async fn render_failure_cleans_up_and_hides_engine_message() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::FailAfterPartialWrite);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    let err = pipeline
        .run(MixRequest::new(vec![track("a.mp3", 30.0), track("b.mp3", 30.0)], 5))
        .await
        .unwrap_err();

    match &err {
        AutomixError::RenderFailure { engine_message } => {
            assert!(engine_message.contains("Conversion failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let response = err.to_response();
    assert_eq!(response.status, 500);
    assert_eq!(response.error, GENERIC_FAILURE_MESSAGE);
    assert!(leftover_entries(root.path()).is_empty());
}

#[tokio::test]
async fn render_without_output_is_a_failure() {
    for behavior in [RenderBehavior::WriteNothing, RenderBehavior::WriteEmpty] {
        let root = tempfile::TempDir::new().unwrap();
        let engine = ScriptedEngine::new(behavior);
        let pipeline = pipeline(engine, root.path());

        let err = pipeline
            .run(MixRequest::new(vec![track("a.mp3", 30.0), track("b.mp3", 30.0)], 5))
            .await
            .unwrap_err();

        assert!(
            matches!(err, AutomixError::RenderFailure { .. }),
            "{behavior:?} gave {err}"
        );
        assert!(leftover_entries(root.path()).is_empty());
    }
}

#[tokio::test]
async fn probe_failure_aborts_before_render_and_cleans_up() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    let err = pipeline
        .run(MixRequest::new(
            vec![
                track("a.mp3", 30.0),
                track("b.mp3", 30.0),
                Track::from_bytes("c.mp3", b"unreadable".to_vec()),
            ],
            5,
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AutomixError::ProbeFailure { track_index: 2, .. }
    ));
    assert!(engine.jobs().is_empty());
    assert!(leftover_entries(root.path()).is_empty());
}

#[tokio::test]
async fn persist_failure_releases_workspace() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    let err = pipeline
        .run(MixRequest::new(
            vec![
                track("a.mp3", 30.0),
                Track::from_path(root.path().join("missing.mp3")),
            ],
            5,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AutomixError::IoFailure { .. }), "{err}");
    assert_eq!(err.to_response().status, 500);
    assert!(leftover_entries(root.path()).is_empty());
    assert!(engine.jobs().is_empty());
}

#[tokio::test]
async fn workspace_acquire_failure_is_internal() {
    let root = tempfile::TempDir::new().unwrap();
    let blocker = root.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), &blocker);

    let err = pipeline
        .run(MixRequest::new(vec![track("a.mp3", 30.0), track("b.mp3", 30.0)], 5))
        .await
        .unwrap_err();

    assert!(matches!(err, AutomixError::IoFailure { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(engine.jobs().is_empty());
    assert!(blocker.is_file());
}

#[tokio::test]
async fn unavailable_engine_is_reported() {
    let root = tempfile::TempDir::new().unwrap();
    let offline = pipeline(ScriptedEngine::unavailable(), root.path());
    let ready = pipeline(ScriptedEngine::new(RenderBehavior::Succeed), root.path());

    let err = offline.ensure_engine_available().unwrap_err();
    match &err {
        AutomixError::EngineUnavailable { message } => assert!(message.contains("scripted")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_response().status, 500);
    assert!(ready.ensure_engine_available().is_ok());
}

#[tokio::test]
async fn duplicate_names_are_persisted_separately() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), root.path());

    pipeline
        .run(MixRequest::new(
            vec![
                Track::from_bytes("loop.mp3", b"duration=10\nfirst".to_vec()),
                Track::from_bytes("loop.mp3", b"duration=12\nsecond".to_vec()),
            ],
            5,
        ))
        .await
        .unwrap();

    let seen = engine.inputs_seen.lock().unwrap().clone();
    assert_eq!(seen[0], b"duration=10\nfirst".to_vec());
    assert_eq!(seen[1], b"duration=12\nsecond".to_vec());
}

#[tokio::test]
async fn concurrent_requests_use_disjoint_workspaces() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = Arc::new(pipeline(Arc::clone(&engine), root.path()));

    let mut handles = Vec::new();
    for i in 0..4 {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move {
            pipeline
                .run(MixRequest::new(
                    vec![track("a.mp3", 20.0 + i as f64), track("b.mp3", 30.0)],
                    5,
                ))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let jobs = engine.jobs();
    assert_eq!(jobs.len(), 4);
    let mut dirs: Vec<PathBuf> = jobs
        .iter()
        .map(|j| j.output_path.parent().unwrap().to_path_buf())
        .collect();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 4);
    assert!(leftover_entries(root.path()).is_empty());
}

#[tokio::test]
async fn progress_callback_reaches_caller() {
    let root = tempfile::TempDir::new().unwrap();
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(engine, root.path());

    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let callback: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p));

    pipeline
        .run_with_progress(
            MixRequest::new(vec![track("a.mp3", 30.0), track("b.mp3", 30.0)], 5),
            Some(callback),
        )
        .await
        .unwrap();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].complete);
}

#[tokio::test]
async fn plan_probes_files_in_place() {
    let root = tempfile::TempDir::new().unwrap();
    let a = root.path().join("a.mp3");
    let b = root.path().join("b.mp3");
    std::fs::write(&a, "duration=6").unwrap();
    std::fs::write(&b, "duration=40").unwrap();

    let work = root.path().join("work");
    let engine = ScriptedEngine::new(RenderBehavior::Succeed);
    let pipeline = pipeline(Arc::clone(&engine), &work);

    let plan = pipeline.plan(&[a.clone(), b.clone()], 10).await.unwrap();
    assert_eq!(plan.crossfade.resolved_secs, 5);
    assert_eq!(plan.graph.step_count(), 1);
    assert!(engine.jobs().is_empty());
    assert!(!work.exists());

    let err = pipeline.plan(&[a], 5).await.unwrap_err();
    assert!(matches!(err, AutomixError::InvalidRequest { .. }));

    let err = pipeline
        .plan(&[b, root.path().join("missing.mp3")], 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AutomixError::InvalidRequest { .. }));
}
