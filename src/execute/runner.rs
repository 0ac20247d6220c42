use crate::{
    compose::plan::{CompositionPlan, StepKind},
    execute::{cancel::CancelToken, engine::MediaEngine},
    foundation::error::{ClipforgeError, ClipforgeResult},
};

/// Progress report emitted before each step runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepProgress {
    /// 1-based step index.
    pub index: usize,
    /// Number of steps in the plan.
    pub total: usize,
    /// Step kind.
    pub kind: StepKind,
    /// Step description.
    pub description: String,
}

/// Progress sink for [`execute_plan`].
pub type ProgressFn<'a> = &'a (dyn Fn(&StepProgress) + Send + Sync);

/// Run `plan`'s steps in order on `engine` and return the plan's output name.
///
/// Progress is reported before each step. The first failing step aborts the plan: later
/// steps are never sent to the engine and the error names the step. Cancellation is checked
/// before each step. No retries happen here.
#[tracing::instrument(skip_all, fields(steps = plan.steps.len()))]
pub async fn execute_plan(
    plan: &CompositionPlan,
    engine: &dyn MediaEngine,
    on_progress: Option<ProgressFn<'_>>,
    cancel: &CancelToken,
) -> ClipforgeResult<String> {
    let total = plan.steps.len();
    for (i, step) in plan.steps.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(next_step = i + 1, "plan execution cancelled");
            return Err(ClipforgeError::Cancelled);
        }

        let progress = StepProgress {
            index: i + 1,
            total,
            kind: step.kind,
            description: step.description.clone(),
        };
        if let Some(report) = on_progress {
            report(&progress);
        }

        tracing::debug!(
            step = i + 1,
            total,
            description = %step.description,
            command = %step.command.join(" "),
            "executing step"
        );
        if let Err(err) = engine.exec(&step.command).await {
            let message = match err {
                ClipforgeError::Engine(m) => m,
                other => other.to_string(),
            };
            tracing::error!(step = i + 1, description = %step.description, %message, "step failed");
            return Err(ClipforgeError::Step {
                index: i + 1,
                total,
                description: step.description.clone(),
                message,
            });
        }
    }
    Ok(plan.output_file.clone())
}

#[cfg(test)]
#[path = "../../tests/unit/execute/runner.rs"]
mod tests;
