use std::path::{Path, PathBuf};

use fuser_core::{
    AxisKnobVals, AxisVals, ExtensionMap, LookatVals, Mat4d, Registry, RotationOrder, SceneLoader,
    SceneReadSettings,
};
use glam::DVec3;
use serde::Deserialize;
use serde_json::{json, Value};

/// A batch of transform operations read from JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HeadlessPlan {
    pub(crate) settings: SceneReadSettings,
    pub(crate) operations: Vec<PlanOp>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum PlanOp {
    /// Builds parent/local/world matrices from channel values.
    Compose { vals: AxisVals },
    /// Splits one matrix into channels.
    Decompose {
        matrix: Mat4d,
        #[serde(default)]
        rot_order: Option<RotationOrder>,
        #[serde(default)]
        apply_to_parent: bool,
    },
    /// Decomposes a time-sampled matrix sequence with the plan settings.
    DecomposeSamples {
        times: Vec<f64>,
        matrices: Vec<Mat4d>,
        #[serde(default)]
        parents: Option<Vec<Mat4d>>,
    },
    Lookat {
        #[serde(default)]
        lookat: LookatVals,
        #[serde(default)]
        vals: AxisVals,
        #[serde(default)]
        parent: Mat4d,
        #[serde(default)]
        target: Option<DVec3>,
    },
    EulerFilter {
        #[serde(default)]
        rot_order: Option<RotationOrder>,
        samples: Vec<AxisVals>,
        #[serde(default)]
        sort: bool,
    },
    PluginType { paths: Vec<String> },
    /// Lists a scene file's nodes and samples one node through the IO
    /// plugins registered in this process.
    Snapshot {
        file: String,
        #[serde(default)]
        node_path: String,
        #[serde(default)]
        times: Vec<f64>,
    },
}

struct HeadlessArgs {
    plan_path: Option<PathBuf>,
    save_path: Option<PathBuf>,
    print: bool,
}

pub(crate) fn run(args: &[String]) -> Result<(), String> {
    let parsed = parse_headless_args(args)?;
    let plan = match parsed.plan_path {
        Some(path) => load_headless_plan(&path)?,
        None => default_headless_plan(),
    };

    let results = run_plan(&plan)?;
    let json = serde_json::to_string_pretty(&results).map_err(|err| err.to_string())?;

    if let Some(path) = parsed.save_path {
        std::fs::write(&path, &json).map_err(|err| format!("cannot write {path:?}: {err}"))?;
        tracing::info!("headless: saved results to {:?}", path);
    }
    if parsed.print {
        println!("{json}");
    }

    tracing::info!("headless: completed {} operations", plan.operations.len());
    Ok(())
}

fn parse_headless_args(args: &[String]) -> Result<HeadlessArgs, String> {
    let mut plan_path = None;
    let mut save_path = None;
    let mut print = false;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--plan" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--plan requires a path".to_string())?;
                plan_path = Some(PathBuf::from(value));
            }
            "--save" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--save requires a path".to_string())?;
                save_path = Some(PathBuf::from(value));
            }
            "--print" => print = true,
            "--log-level" => {
                // Consumed by main before tracing is installed.
                iter.next();
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    if save_path.is_none() {
        print = true;
    }
    Ok(HeadlessArgs {
        plan_path,
        save_path,
        print,
    })
}

pub(crate) fn print_headless_help() {
    println!(
        "Usage: fuser [options]\n  --plan <path>       JSON plan to run (a small demo plan otherwise)\n  --save <path>       write results as JSON\n  --print             print results (default when not saving)\n  --log-level <lvl>   off|error|warn|info|debug|trace"
    );
}

fn load_headless_plan(path: &Path) -> Result<HeadlessPlan, String> {
    let data = std::fs::read(path).map_err(|err| format!("cannot read {path:?}: {err}"))?;
    serde_json::from_slice(&data).map_err(|err| format!("invalid plan {path:?}: {err}"))
}

fn default_headless_plan() -> HeadlessPlan {
    let mut vals = AxisVals::new(1.0);
    vals.translate = DVec3::new(0.0, 1.0, 5.0);
    HeadlessPlan {
        settings: SceneReadSettings::default(),
        operations: vec![
            PlanOp::Compose { vals: vals.clone() },
            PlanOp::Lookat {
                lookat: LookatVals {
                    use_point: true,
                    ..LookatVals::default()
                },
                vals,
                parent: Mat4d::IDENTITY,
                target: None,
            },
            PlanOp::PluginType {
                paths: vec!["/show/shot.usd".to_string(), "abc:/show/cache".to_string()],
            },
        ],
    }
}

pub(crate) fn run_plan(plan: &HeadlessPlan) -> Result<Vec<Value>, String> {
    let settings = &plan.settings;
    let extensions = ExtensionMap::global();
    extensions.add_mappings(&settings.extension_mappings);

    plan.operations
        .iter()
        .enumerate()
        .map(|(idx, op)| {
            run_op(settings, extensions, op).map_err(|err| format!("operation {idx}: {err}"))
        })
        .collect()
}

fn run_op(settings: &SceneReadSettings, extensions: &ExtensionMap, op: &PlanOp) -> Result<Value, String> {
    let value = match op {
        PlanOp::Compose { vals } => {
            let knob = AxisKnobVals::new(vals.clone());
            json!({
                "op": "compose",
                "parent": knob.parent_matrix,
                "local": knob.local_matrix,
                "world": knob.world_matrix(),
            })
        }
        PlanOp::Decompose {
            matrix,
            rot_order,
            apply_to_parent,
        } => {
            let order = rot_order.unwrap_or(settings.decompose_rot_order);
            let mut vals = AxisVals::default();
            let ok = vals.extract_from_matrix(
                matrix,
                settings.t_enable,
                settings.r_enable,
                settings.s_enable,
                order,
                *apply_to_parent,
            );
            json!({ "op": "decompose", "ok": ok, "vals": vals })
        }
        PlanOp::DecomposeSamples {
            times,
            matrices,
            parents,
        } => {
            let samples =
                fuser_core::samples_from_matrices(settings, times, matrices, parents.as_deref())?;
            json!({ "op": "decompose_samples", "samples": samples })
        }
        PlanOp::Lookat {
            lookat,
            vals,
            parent,
            target,
        } => {
            let matrix = lookat.lookat_xform(parent, vals, *target);
            json!({ "op": "lookat", "world": matrix })
        }
        PlanOp::EulerFilter {
            rot_order,
            samples,
            sort,
        } => {
            let order = rot_order.unwrap_or(settings.decompose_rot_order);
            let mut samples = samples.clone();
            AxisVals::apply_euler_filter(order, &mut samples, *sort);
            json!({ "op": "euler_filter", "samples": samples })
        }
        PlanOp::PluginType { paths } => {
            let resolved: Vec<Value> = paths
                .iter()
                .map(|path| {
                    let (file, plugin_type) = extensions.plugin_type_for_path(path);
                    json!({ "path": path, "file": file, "plugin_type": plugin_type })
                })
                .collect();
            json!({ "op": "plugin_type", "paths": resolved })
        }
        PlanOp::Snapshot {
            file,
            node_path,
            times,
        } => {
            let mut loader = SceneLoader::new(SceneReadSettings {
                file: file.clone(),
                node_path: node_path.clone(),
                ..settings.clone()
            });
            let snapshot = fuser_core::load_snapshot(Registry::global(), &mut loader, times)?;
            let nodes: Vec<Value> = snapshot
                .nodes
                .iter()
                .map(|node| json!({ "path": node.path, "node_type": node.node_type }))
                .collect();
            let xforms: Vec<Value> = snapshot
                .xforms
                .iter()
                .map(|xform| {
                    json!({
                        "time": xform.time,
                        "world": xform.world.to_cols_array(),
                    })
                })
                .collect();
            json!({
                "op": "snapshot",
                "file": snapshot.file,
                "node_path": loader.settings.node_path,
                "nodes": nodes,
                "xforms": xforms,
            })
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("fuser")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_plan_and_save_paths() {
        let parsed = parse_headless_args(&args(&["--plan", "p.json", "--save", "out.json"])).unwrap();
        assert_eq!(parsed.plan_path, Some(PathBuf::from("p.json")));
        assert!(!parsed.print);
        assert!(parse_headless_args(&args(&["--plan"])).is_err());
        assert!(parse_headless_args(&args(&["--bogus"])).is_err());
        assert!(parse_headless_args(&args(&["--log-level", "debug"])).unwrap().print);
    }

    #[test]
    fn runs_plan_from_json() {
        let plan: HeadlessPlan = serde_json::from_str(
            r#"{
                "settings": { "extension_mappings": "usd,usda=UsdIO" },
                "operations": [
                    { "op": "compose", "vals": { "translate": [1.0, 2.0, 3.0] } },
                    { "op": "decompose", "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 4,5,6,1] },
                    { "op": "euler_filter", "rot_order": "XYZ", "samples": [
                        { "time": 1.0, "rotate": [0.0, 0.0, 170.0] },
                        { "time": 2.0, "rotate": [0.0, 0.0, -175.0] }
                    ] },
                    { "op": "plugin_type", "paths": ["/a/b.USDA", "/a/c.abc"] }
                ]
            }"#,
        )
        .unwrap();
        let results = run_plan(&plan).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0]["world"][12], json!(1.0));
        assert_eq!(results[1]["ok"], json!(true));
        assert_eq!(results[1]["vals"]["translate"], json!([4.0, 5.0, 6.0]));
        assert_eq!(results[2]["samples"][1]["rotate"][2], json!(185.0));
        assert_eq!(results[3]["paths"][0]["plugin_type"], json!("UsdIO"));
        assert_eq!(results[3]["paths"][1]["plugin_type"], json!("AbcIO"));
    }

    #[test]
    fn sample_errors_name_the_operation() {
        let plan = HeadlessPlan {
            operations: vec![PlanOp::DecomposeSamples {
                times: vec![1.0, 2.0],
                matrices: vec![Mat4d::IDENTITY],
                parents: None,
            }],
            ..HeadlessPlan::default()
        };
        let err = run_plan(&plan).unwrap_err();
        assert!(err.starts_with("operation 0:"), "{err}");
    }

    #[test]
    fn plan_mappings_reach_the_process_map() {
        let plan: HeadlessPlan = serde_json::from_str(
            r#"{
                "settings": { "extension_mappings": "hfk=HeadlessFakeIO" },
                "operations": [{ "op": "plugin_type", "paths": ["/a/b.hfk"] }]
            }"#,
        )
        .unwrap();
        let results = run_plan(&plan).unwrap();
        assert_eq!(results[0]["paths"][0]["plugin_type"], json!("HeadlessFakeIO"));
        assert_eq!(ExtensionMap::global().get("hfk").as_deref(), Some("HeadlessFakeIO"));
    }

    #[test]
    fn snapshot_without_plugin_names_the_file() {
        let plan: HeadlessPlan = serde_json::from_str(
            r#"{ "operations": [{ "op": "snapshot", "file": "/show/shot.nosuchfmt", "times": [1.0] }] }"#,
        )
        .unwrap();
        let err = run_plan(&plan).unwrap_err();
        assert!(err.starts_with("operation 0:"), "{err}");
        assert!(err.contains("/show/shot.nosuchfmt"), "{err}");
    }

    #[test]
    fn default_plan_runs() {
        let results = run_plan(&default_headless_plan()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[2]["paths"][0]["plugin_type"], json!("UsdIO"));
    }
}
