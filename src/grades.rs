use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: String,
    pub min_marks: i64,
}

/// Marks-to-grade table, highest band first. Marks below every band get
/// `fallback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeScale {
    pub bands: Vec<GradeBand>,
    pub fallback: String,
}

impl Default for GradeScale {
    fn default() -> Self {
        let band = |grade: &str, min_marks: i64| GradeBand {
            grade: grade.to_string(),
            min_marks,
        };
        GradeScale {
            bands: vec![
                band("A", 90),
                band("B", 80),
                band("C", 70),
                band("D", 60),
                band("E", 50),
            ],
            fallback: "F".to_string(),
        }
    }
}

impl GradeScale {
    pub fn grade_for(&self, marks: i64) -> &str {
        self.bands
            .iter()
            .find(|b| marks >= b.min_marks)
            .map(|b| b.grade.as_str())
            .unwrap_or(self.fallback.as_str())
    }
}
