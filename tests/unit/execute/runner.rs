use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;
use crate::{
    compose::{
        plan::{PlanOptions, plan},
        settings::ExportSettings,
    },
    execute::cancel::cancel_pair,
    timeline::clip::Clip,
};

#[derive(Default)]
struct ScriptedEngine {
    fail_on: Option<usize>,
    execs: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    async fn load(&self, _source: &str) -> ClipforgeResult<()> {
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        true
    }

    async fn write_file(&self, _path: &str, _bytes: &[u8]) -> ClipforgeResult<()> {
        Ok(())
    }

    async fn read_file(&self, _path: &str) -> ClipforgeResult<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn exec(&self, argv: &[String]) -> ClipforgeResult<()> {
        let mut execs = self.execs.lock().unwrap();
        execs.push(argv.to_vec());
        if self.fail_on == Some(execs.len()) {
            return Err(ClipforgeError::engine("Invalid argument"));
        }
        Ok(())
    }

    async fn delete_file(&self, _path: &str) -> ClipforgeResult<()> {
        Ok(())
    }

    async fn list_dir(&self, _dir: &str) -> ClipforgeResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn terminate(&self) -> ClipforgeResult<()> {
        Ok(())
    }
}

fn three_step_plan() -> CompositionPlan {
    let clips = vec![
        Clip::new("a", "a.mp4", 4.0).trimmed(1.0, None),
        Clip::new("b", "b.mp4", 4.0),
    ];
    plan(&clips, &ExportSettings::default(), None, &PlanOptions::default()).unwrap()
}

#[tokio::test]
async fn runs_steps_in_order_and_reports_progress() {
    let plan = three_step_plan();
    let engine = ScriptedEngine::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = seen.clone();
        move |p: &StepProgress| seen.lock().unwrap().push((p.index, p.total, p.description.clone()))
    };

    let out = execute_plan(&plan, &engine, Some(&sink), &CancelToken::never())
        .await
        .unwrap();
    assert_eq!(out, "output.mp4");

    let execs = engine.execs.lock().unwrap();
    assert_eq!(execs.len(), 3);
    for (exec, step) in execs.iter().zip(&plan.steps) {
        assert_eq!(exec, &step.command);
    }
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (1, 3, "Trim clip 1".to_string()),
            (2, 3, "Concatenate clips".to_string()),
            (3, 3, "Final encoding".to_string()),
        ]
    );
}

#[tokio::test]
async fn stops_at_first_failing_step() {
    let plan = three_step_plan();
    for k in 1..=3 {
        let engine = ScriptedEngine {
            fail_on: Some(k),
            ..ScriptedEngine::default()
        };
        let err = execute_plan(&plan, &engine, None, &CancelToken::never())
            .await
            .unwrap_err();
        assert_eq!(engine.execs.lock().unwrap().len(), k);
        match err {
            ClipforgeError::Step {
                index,
                total,
                description,
                message,
            } => {
                assert_eq!((index, total), (k, 3));
                assert_eq!(description, plan.steps[k - 1].description);
                assert_eq!(message, "Invalid argument");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[tokio::test]
async fn cancellation_stops_scheduling() {
    let plan = three_step_plan();
    let engine = ScriptedEngine::default();
    let (handle, token) = cancel_pair();
    let sink = move |p: &StepProgress| {
        if p.index == 2 {
            handle.cancel();
        }
    };
    let err = execute_plan(&plan, &engine, Some(&sink), &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(engine.execs.lock().unwrap().len(), 2);
}
