use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    analysis::frame::{AnalyzerOpts, FrameAnalysis, FrameAnalyzer, FrameSource},
    foundation::core::{Point, Size},
    placement::score::suggest_from_analysis,
};

/// Options for [`PositionSuggester::suggest`].
#[derive(Clone, Debug, PartialEq)]
pub struct SuggestOpts {
    /// Upper bound on frame analysis; zero waits indefinitely.
    pub timeout: Duration,
    /// Analyzer configuration used when the suggester is created.
    pub analyzer: AnalyzerOpts,
}

impl Default for SuggestOpts {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            analyzer: AnalyzerOpts::default(),
        }
    }
}

/// Auto-placement for PiP overlays.
///
/// Owns a [`FrameAnalyzer`] so consecutive suggestions can detect motion. Analysis runs on the
/// blocking pool; a late analysis still updates the cached frame.
#[derive(Clone, Debug)]
pub struct PositionSuggester {
    analyzer: Arc<Mutex<FrameAnalyzer>>,
    timeout: Duration,
}

impl Default for PositionSuggester {
    fn default() -> Self {
        Self::new(SuggestOpts::default())
    }
}

impl PositionSuggester {
    /// Build a suggester.
    pub fn new(opts: SuggestOpts) -> Self {
        Self {
            analyzer: Arc::new(Mutex::new(FrameAnalyzer::new(opts.analyzer))),
            timeout: opts.timeout,
        }
    }

    /// Analyse the current frame of `source` and pick the best overlay position.
    ///
    /// The result is in container coordinates. Timeouts and analysis failures fall back to
    /// positional scoring over an empty analysis.
    #[tracing::instrument(skip(self, source))]
    pub async fn suggest<S>(&self, source: S, overlay: Size, container: Size) -> Point
    where
        S: FrameSource + Send + 'static,
    {
        let analysis = self.analyze_in_container_space(source, container).await;
        suggest_from_analysis(&analysis, overlay, container)
    }

    async fn analyze_in_container_space<S>(&self, mut source: S, container: Size) -> FrameAnalysis
    where
        S: FrameSource + Send + 'static,
    {
        let analyzer = Arc::clone(&self.analyzer);
        let task = tokio::task::spawn_blocking(move || {
            let frame = match source.read_frame() {
                Ok(f) => f,
                Err(err) => {
                    tracing::warn!(%err, "frame read failed, analysis skipped");
                    return None;
                }
            };
            let mut guard = match analyzer.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            let analysis = guard.analyze(&frame);
            Some((analysis, frame.width(), frame.height()))
        });

        let joined = if self.timeout.is_zero() {
            task.await
        } else {
            match tokio::time::timeout(self.timeout, task).await {
                Ok(r) => r,
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "frame analysis timed out, using positional scoring only"
                    );
                    return FrameAnalysis::default();
                }
            }
        };

        match joined {
            Ok(Some((analysis, fw, fh))) if fw > 0 && fh > 0 => analysis.scaled(
                container.width / f64::from(fw),
                container.height / f64::from(fh),
            ),
            Ok(_) => FrameAnalysis::default(),
            Err(err) => {
                tracing::warn!(%err, "frame analysis task failed");
                FrameAnalysis::default()
            }
        }
    }
}

/// One-shot placement with a fresh analyzer (no motion history).
pub async fn suggest<S>(source: S, overlay: Size, container: Size, opts: SuggestOpts) -> Point
where
    S: FrameSource + Send + 'static,
{
    PositionSuggester::new(opts)
        .suggest(source, overlay, container)
        .await
}

#[cfg(test)]
#[path = "../../tests/unit/placement/suggest.rs"]
mod tests;
