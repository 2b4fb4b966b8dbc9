//! Mix pipeline orchestration.
//!
//! Sequences workspace, persistence, probing, crossfade resolution, graph
//! building, rendering, and artifact read-back. The workspace is released
//! on every path once it has been acquired.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use automix_common::config::AppConfig;
use automix_common::error::{AutomixError, AutomixResult};
use automix_mix_model::{
    now_rfc3339, CrossfadeGraph, DurationReport, MixArtifact, MixReport, MixRequest, MIN_TRACKS,
};

use crate::engine::{ensure_available, AudioEngine, ProgressCallback};
use crate::graph::build_graph;
use crate::probe::probe_durations;
use crate::render::render_graph;
use crate::safety::{ResolvedCrossfade, SafetyPolicy};
use crate::workspace::{Workspace, WorkspaceManager};

/// Stages of a mix request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    WorkspacePrepared,
    InputsPersisted,
    DurationsProbed,
    GraphBuilt,
    Rendered,
    ArtifactRead,
    Released,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::WorkspacePrepared => "workspace_prepared",
            Self::InputsPersisted => "inputs_persisted",
            Self::DurationsProbed => "durations_probed",
            Self::GraphBuilt => "graph_built",
            Self::Rendered => "rendered",
            Self::ArtifactRead => "artifact_read",
            Self::Released => "released",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline settings derived from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workspace_root: PathBuf,
    pub workspace_prefix: String,
    pub safety: SafetyPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> AutomixResult<Self> {
        config.validate()?;
        Ok(Self {
            workspace_root: config.mix.resolved_workspace_root(),
            workspace_prefix: config.mix.workspace_prefix.clone(),
            safety: SafetyPolicy::new(config.mix.headroom_ratio)?,
        })
    }

    /// Default policy with workspaces under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: root.into(),
            workspace_prefix: "automix-".to_string(),
            safety: SafetyPolicy::default(),
        }
    }
}

/// A mix computed without rendering.
#[derive(Debug, Clone)]
pub struct MixPlan {
    pub durations: DurationReport,
    pub crossfade: ResolvedCrossfade,
    pub graph: CrossfadeGraph,
    pub expected_duration_secs: f64,
}

/// Generates crossfaded mixes through an [`AudioEngine`].
///
/// Holds no per-request state; one pipeline can serve concurrent requests.
pub struct MixPipeline {
    engine: Arc<dyn AudioEngine>,
    workspaces: WorkspaceManager,
    safety: SafetyPolicy,
}

impl MixPipeline {
    pub fn new(engine: Arc<dyn AudioEngine>, settings: PipelineSettings) -> Self {
        Self {
            engine,
            workspaces: WorkspaceManager::new(settings.workspace_root, settings.workspace_prefix),
            safety: settings.safety,
        }
    }

    pub fn engine(&self) -> &dyn AudioEngine {
        self.engine.as_ref()
    }

    /// Check the engine once before accepting requests.
    pub fn ensure_engine_available(&self) -> AutomixResult<()> {
        ensure_available(self.engine.as_ref())
    }

    /// Generate a mix.
    pub async fn run(&self, request: MixRequest) -> AutomixResult<MixArtifact> {
        self.run_with_progress(request, None).await
    }

    /// Generate a mix, reporting render progress to `progress`.
    pub async fn run_with_progress(
        &self,
        request: MixRequest,
        progress: Option<ProgressCallback>,
    ) -> AutomixResult<MixArtifact> {
        tracing::info!(
            tracks = request.track_count(),
            crossfade_secs = request.crossfade_secs(),
            "Starting mix"
        );

        // Rejected before anything is allocated.
        if let Err(err) = request.validate() {
            tracing::warn!(
                stage = %PipelineStage::Validating,
                error = %err,
                "Mix request rejected"
            );
            return Err(err);
        }

        let workspace = self.workspaces.acquire().await.map_err(|err| {
            tracing::error!(
                stage = %PipelineStage::WorkspacePrepared,
                error = %err,
                "Mix generation failed"
            );
            err
        })?;

        let mut stage = PipelineStage::WorkspacePrepared;
        tracing::debug!(%stage, workspace = %workspace.path().display(), "Stage reached");

        let result = self
            .run_in_workspace(&workspace, request, progress, &mut stage)
            .await;

        if let Err(err) = &result {
            tracing::error!(%stage, error = %err, "Mix generation failed");
        }

        workspace.release().await;
        tracing::debug!(stage = %PipelineStage::Released, "Stage reached");

        if let Ok(artifact) = &result {
            tracing::info!(
                bytes = artifact.bytes.len(),
                resolved_crossfade_secs = artifact.report.resolved_crossfade_secs,
                render_elapsed_secs = artifact.report.render_elapsed_secs,
                "Mix generated"
            );
        }
        result
    }

    async fn run_in_workspace(
        &self,
        workspace: &Workspace,
        request: MixRequest,
        progress: Option<ProgressCallback>,
        stage: &mut PipelineStage,
    ) -> AutomixResult<MixArtifact> {
        let (tracks, requested_secs) = request.into_parts();
        let track_count = tracks.len();

        let inputs = workspace.persist_tracks(tracks).await?;
        advance(stage, PipelineStage::InputsPersisted);

        let durations = probe_durations(Arc::clone(&self.engine), &inputs).await?;
        advance(stage, PipelineStage::DurationsProbed);

        let crossfade = self.resolve(requested_secs, &durations);
        let graph = build_graph(track_count, crossfade.resolved_secs)?;
        let filter_graph = graph.to_filter_complex();
        let expected_duration_secs = durations.mixed_length_secs(crossfade.resolved_secs);
        advance(stage, PipelineStage::GraphBuilt);

        let output_path = workspace.output_path();
        let render_started = std::time::Instant::now();
        render_graph(
            Arc::clone(&self.engine),
            inputs,
            &graph,
            output_path.clone(),
            expected_duration_secs,
            progress,
        )
        .await?;
        let render_elapsed_secs = render_started.elapsed().as_secs_f64();
        advance(stage, PipelineStage::Rendered);

        let bytes = tokio::fs::read(&output_path)
            .await
            .map_err(|e| AutomixError::io("reading rendered mix", e))?;
        if bytes.is_empty() {
            return Err(AutomixError::render("engine produced an empty mix"));
        }
        advance(stage, PipelineStage::ArtifactRead);

        let report = MixReport {
            track_count,
            durations,
            requested_crossfade_secs: crossfade.requested_secs,
            resolved_crossfade_secs: crossfade.resolved_secs,
            clamped: crossfade.clamped,
            filter_graph,
            expected_duration_secs,
            rendered_at: now_rfc3339(),
            render_elapsed_secs,
        };
        Ok(MixArtifact::new(bytes, report))
    }

    /// Probe files in place and compute the mix without rendering it.
    pub async fn plan(&self, paths: &[PathBuf], requested_secs: u32) -> AutomixResult<MixPlan> {
        if paths.len() < MIN_TRACKS {
            return Err(AutomixError::invalid_request(format!(
                "At least {MIN_TRACKS} files are required"
            )));
        }
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(AutomixError::invalid_request(format!(
                "Not a file: {}",
                missing.display()
            )));
        }

        let durations = probe_durations(Arc::clone(&self.engine), paths).await?;
        let crossfade = self.resolve(requested_secs, &durations);
        let graph = build_graph(paths.len(), crossfade.resolved_secs)?;
        let expected_duration_secs = durations.mixed_length_secs(crossfade.resolved_secs);

        Ok(MixPlan {
            durations,
            crossfade,
            graph,
            expected_duration_secs,
        })
    }

    fn resolve(&self, requested_secs: u32, durations: &DurationReport) -> ResolvedCrossfade {
        let crossfade = self.safety.resolve(requested_secs, durations.as_slice());
        if crossfade.clamped {
            tracing::info!(
                requested_secs,
                resolved_secs = crossfade.resolved_secs,
                shortest_secs = crossfade.shortest_secs,
                "Crossfade clamped to shortest track"
            );
        }
        crossfade
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    *stage = next;
    tracing::debug!(stage = %next, "Stage reached");
}
