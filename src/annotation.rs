//! Annotator resolutions and the submitted annotation.
//!
//! After pre-annotation the annotator resolves every mismatched area by
//! picking one candidate, or skips it. Resolutions live outside the engine
//! output, keyed by area id. From them this module derives:
//!
//! - the merged trajectory: all area geometries concatenated in id order
//! - the per-method analysis: how many areas and points each method got wrong

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::areas::{MergedSubTrajArray, MismatchedArea, PreprocessAreas, SubTrajOwner};
use crate::{AnnotateError, Coordinate, MatchingMethod, MethodResult, OptionExt, Result};

/// The annotator's decision for one mismatched area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Index into the area's `sub_trajs`
    Selected(usize),
    Skipped,
}

/// Resolutions keyed by mismatched area id.
pub type Resolutions = BTreeMap<u32, Resolution>;

/// Per-method error counts reported with a submitted annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodAnalysis {
    pub mismatched_area_count: u32,
    pub mismatched_point_count: u32,
    pub total_point_count: u32,
}

/// Final annotation payload: merged trajectory plus per-method analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSubmission {
    pub trajectory: Vec<Coordinate>,
    /// `[method_name, analysis]` pairs in input order
    pub analysis: Vec<(String, MethodAnalysis)>,
}

/// The candidate chosen for a mismatched area, `None` when skipped.
fn selected_candidate<'a>(
    area: &'a MismatchedArea,
    resolution: Resolution,
) -> Result<Option<(usize, &'a MergedSubTrajArray)>> {
    match resolution {
        Resolution::Skipped => Ok(None),
        Resolution::Selected(index) => area
            .sub_trajs
            .get(index)
            .map(|candidate| Some((index, candidate)))
            .ok_or(AnnotateError::InvalidSelection {
                id: area.id,
                selected: index,
                candidate_count: area.sub_trajs.len(),
            }),
    }
}

/// Concatenate all area geometries in id order.
///
/// Consecutive areas share their boundary coordinate, so every area after the
/// first contributes its path without the first point. Each mismatched area
/// must have a selected candidate.
pub fn merge_annotated_trajectory(
    areas: &PreprocessAreas,
    resolutions: &Resolutions,
) -> Result<Vec<Coordinate>> {
    let mut pieces: Vec<(u32, &[Coordinate])> = Vec::with_capacity(areas.area_count());

    pieces.extend(areas.matched_areas.iter().map(|a| (a.id, a.sub_traj.traj.as_slice())));
    pieces.extend(
        areas
            .prematched_areas
            .iter()
            .map(|a| (a.id, a.sub_traj.traj.as_slice())),
    );
    for area in &areas.mismatched_areas {
        let resolution = resolutions.get(&area.id).copied().ok_or_unresolved(area.id)?;
        let (_, candidate) = selected_candidate(area, resolution)?.ok_or_unresolved(area.id)?;
        pieces.push((area.id, candidate.traj.as_slice()));
    }

    pieces.sort_by_key(|(id, _)| *id);

    let mut trajectory = Vec::new();
    for (i, (_, traj)) in pieces.into_iter().enumerate() {
        let skip = usize::from(i > 0);
        trajectory.extend(traj.iter().skip(skip).copied());
    }
    Ok(trajectory)
}

/// Count, per method, the areas and points it got wrong.
///
/// A method is charged for a mismatched area when its candidate was not the
/// selected one, and for a pre-matched area when its contribution needed loop
/// collapse to agree. Skipped and unresolved areas are not charged. Entries
/// follow the order of `methods`.
pub fn analyze_methods(
    methods: &[MethodResult],
    areas: &PreprocessAreas,
    resolutions: &Resolutions,
) -> Result<Vec<(String, MethodAnalysis)>> {
    let mut charges: HashMap<MatchingMethod, MethodAnalysis> = HashMap::new();
    let mut charge = |owner: &SubTrajOwner| -> Result<()> {
        let points = owner.point_count()?;
        let entry = charges.entry(owner.owner_type.clone()).or_default();
        entry.mismatched_area_count = entry
            .mismatched_area_count
            .checked_add(1)
            .ok_or_internal("mismatched area count overflow")?;
        entry.mismatched_point_count = entry
            .mismatched_point_count
            .checked_add(points)
            .ok_or_internal("mismatched point count overflow")?;
        Ok(())
    };

    for area in &areas.mismatched_areas {
        let Some(&resolution) = resolutions.get(&area.id) else {
            continue;
        };
        let Some((selected, _)) = selected_candidate(area, resolution)? else {
            continue;
        };
        for (index, candidate) in area.sub_trajs.iter().enumerate() {
            if index == selected {
                continue;
            }
            for owner in &candidate.owners {
                charge(owner)?;
            }
        }
    }

    for area in &areas.prematched_areas {
        for owner in area.sub_traj.owners.iter().filter(|o| o.has_error) {
            charge(owner)?;
        }
    }

    methods
        .iter()
        .map(|result| {
            let total_point_count =
                u32::try_from(result.trajectory.len()).map_err(|_| AnnotateError::Internal {
                    message: format!("{} exceeds the u32 point range", result.method_name),
                })?;
            let analysis = MethodAnalysis {
                total_point_count,
                ..charges.get(&result.method()).copied().unwrap_or_default()
            };
            Ok((result.method_name.clone(), analysis))
        })
        .collect()
}

/// Build the payload persisted for a finished annotation.
pub fn submit_annotation(
    methods: &[MethodResult],
    areas: &PreprocessAreas,
    resolutions: &Resolutions,
) -> Result<AnnotationSubmission> {
    Ok(AnnotationSubmission {
        trajectory: merge_annotated_trajectory(areas, resolutions)?,
        analysis: analyze_methods(methods, areas, resolutions)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pre_annotate, PreAnnotationConfig};

    fn path(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points
            .iter()
            .map(|&(lng, lat)| Coordinate::new(lng, lat))
            .collect()
    }

    fn diverging_methods() -> Vec<MethodResult> {
        vec![
            MethodResult::new("GHMapMatching", path(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])),
            MethodResult::new("STMatching", path(&[(0.0, 0.0), (1.0, 5.0), (2.0, 2.0)])),
        ]
    }

    #[test]
    fn test_merge_follows_selection() {
        let methods = diverging_methods();
        let areas = pre_annotate(&methods, &PreAnnotationConfig::default()).unwrap();
        let id = areas.mismatched_areas[0].id;

        let pick_gh = Resolutions::from([(id, Resolution::Selected(0))]);
        let merged = merge_annotated_trajectory(&areas, &pick_gh).unwrap();
        assert_eq!(merged, methods[0].trajectory);

        let pick_st = Resolutions::from([(id, Resolution::Selected(1))]);
        let merged = merge_annotated_trajectory(&areas, &pick_st).unwrap();
        assert_eq!(merged, methods[1].trajectory);
    }

    #[test]
    fn test_merge_requires_every_selection() {
        let areas = pre_annotate(&diverging_methods(), &PreAnnotationConfig::default()).unwrap();
        let id = areas.mismatched_areas[0].id;

        assert_eq!(
            merge_annotated_trajectory(&areas, &Resolutions::new()),
            Err(AnnotateError::UnresolvedArea { id })
        );
        let skipped = Resolutions::from([(id, Resolution::Skipped)]);
        assert_eq!(
            merge_annotated_trajectory(&areas, &skipped),
            Err(AnnotateError::UnresolvedArea { id })
        );
        let out_of_range = Resolutions::from([(id, Resolution::Selected(5))]);
        assert!(matches!(
            merge_annotated_trajectory(&areas, &out_of_range),
            Err(AnnotateError::InvalidSelection { selected: 5, candidate_count: 2, .. })
        ));
    }

    #[test]
    fn test_analysis_charges_rejected_candidates() {
        let methods = diverging_methods();
        let areas = pre_annotate(&methods, &PreAnnotationConfig::default()).unwrap();
        let id = areas.mismatched_areas[0].id;
        let resolutions = Resolutions::from([(id, Resolution::Selected(0))]);

        let analysis = analyze_methods(&methods, &areas, &resolutions).unwrap();
        assert_eq!(analysis[0].0, "GHMapMatching");
        assert_eq!(analysis[0].1, MethodAnalysis {
            mismatched_area_count: 0,
            mismatched_point_count: 0,
            total_point_count: 3,
        });
        assert_eq!(analysis[1].0, "STMatching");
        assert_eq!(analysis[1].1.mismatched_area_count, 1);
        assert_eq!(analysis[1].1.mismatched_point_count, 2);
    }

    #[test]
    fn test_skipped_areas_are_not_charged() {
        let methods = diverging_methods();
        let areas = pre_annotate(&methods, &PreAnnotationConfig::default()).unwrap();
        let id = areas.mismatched_areas[0].id;
        let resolutions = Resolutions::from([(id, Resolution::Skipped)]);

        let analysis = analyze_methods(&methods, &areas, &resolutions).unwrap();
        assert!(analysis.iter().all(|(_, a)| a.mismatched_area_count == 0));
    }

    #[test]
    fn test_prematched_errors_are_charged() {
        let methods = vec![
            MethodResult::new("GHMapMatching", path(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])),
            MethodResult::new(
                "STMatching",
                path(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (1.0, 0.0), (2.0, 0.0)]),
            ),
        ];
        let areas = pre_annotate(&methods, &PreAnnotationConfig::default()).unwrap();
        assert_eq!(areas.prematched_areas.len(), 1);

        let submission = submit_annotation(&methods, &areas, &Resolutions::new()).unwrap();
        assert_eq!(submission.trajectory, methods[0].trajectory);
        assert_eq!(submission.analysis[1].1.mismatched_area_count, 1);
        assert_eq!(submission.analysis[1].1.mismatched_point_count, 3);
        assert_eq!(submission.analysis[0].1.mismatched_area_count, 0);
    }

    #[test]
    fn test_reversed_owner_range_fails_analysis() {
        let methods = vec![
            MethodResult::new("GHMapMatching", path(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])),
            MethodResult::new(
                "STMatching",
                path(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (1.0, 0.0), (2.0, 0.0)]),
            ),
        ];
        let mut areas = pre_annotate(&methods, &PreAnnotationConfig::default()).unwrap();
        let owner = areas.prematched_areas[0]
            .sub_traj
            .owners
            .iter_mut()
            .find(|o| o.has_error)
            .unwrap();
        owner.start_index = 5;
        owner.end_index = 2;

        assert!(matches!(
            analyze_methods(&methods, &areas, &Resolutions::new()),
            Err(AnnotateError::InvalidOwner { start_index: 5, end_index: 2, .. })
        ));
    }

    #[test]
    fn test_resolution_json() {
        let resolutions: Resolutions =
            serde_json::from_str(r#"{"2": {"selected": 1}, "7": "skipped"}"#).unwrap();
        assert_eq!(resolutions[&2], Resolution::Selected(1));
        assert_eq!(resolutions[&7], Resolution::Skipped);

        let analysis = vec![("STMatching".to_string(), MethodAnalysis::default())];
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.starts_with(r#"[["STMatching",{"mismatched_area_count":0"#));
    }
}
