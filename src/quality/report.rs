use super::checks::{context_compliance, level_consistency};
use super::detect::{detect_duplicates, DetectOptions, DuplicateGroup};
use crate::context::LearnerContext;
use crate::store::MaterialStore;

#[derive(Clone, Debug)]
pub struct QualityOptions {
    pub check_context: bool,
    pub check_level: bool,
    pub check_duplicates: bool,
    pub min_context_keywords: usize,
    pub long_expression_words: usize,
    pub long_expression_ratio: f64,
    pub detect: DetectOptions,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            check_context: true,
            check_level: true,
            check_duplicates: true,
            min_context_keywords: 3,
            long_expression_words: 3,
            long_expression_ratio: 0.7,
            detect: DetectOptions::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct QualityReport {
    pub context_issues: Vec<String>,
    pub level_issues: Vec<String>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub materials_checked: usize,
}

impl QualityReport {
    pub fn total_issues(&self) -> usize {
        self.context_issues.len() + self.level_issues.len() + self.duplicate_groups.len()
    }

    pub fn duplicate_issues(&self) -> Vec<String> {
        self.duplicate_groups.iter().map(|g| g.issue_line()).collect()
    }

    #[must_use]
    pub fn render_block(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "QUALITY REPORT ({} materials, {} issues)\n",
            self.materials_checked,
            self.total_issues()
        ));
        let sections = [
            ("context", self.context_issues.clone()),
            ("level", self.level_issues.clone()),
            ("duplicates", self.duplicate_issues()),
        ];
        for (name, issues) in sections {
            if issues.is_empty() {
                out.push_str(&format!("- {name}: ok\n"));
                continue;
            }
            out.push_str(&format!("- {name}: {} issue(s)\n", issues.len()));
            for issue in issues {
                out.push_str(&format!("    {issue}\n"));
            }
        }
        out.trim_end().to_string()
    }
}

pub fn run_quality_check(store: &MaterialStore, ctx: &LearnerContext, opts: &QualityOptions) -> QualityReport {
    let mut report = QualityReport {
        materials_checked: store.len(),
        ..Default::default()
    };
    if opts.check_context {
        report.context_issues = context_compliance(store, ctx, opts.min_context_keywords);
    }
    if opts.check_level {
        report.level_issues =
            level_consistency(store, opts.long_expression_words, opts.long_expression_ratio);
    }
    if opts.check_duplicates {
        report.duplicate_groups = detect_duplicates(store, opts.detect);
    }
    log::info!(
        "quality check: {} materials, {} context / {} level / {} duplicate issues",
        report.materials_checked,
        report.context_issues.len(),
        report.level_issues.len(),
        report.duplicate_groups.len()
    );
    report
}
