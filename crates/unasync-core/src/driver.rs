/*!
# Tree Driver

Walks a list of source files, picks the first rule whose source root
contains each file, and rewrites it into that rule's destination root.
Files no rule claims are skipped. The driver processes one file at a time
and stops at the first error; files written before the error stay written.
*/

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::Result;
use crate::rule::{FileOutcome, Rule};

/// One planned file transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Index into the rules slice the job was planned against
    pub rule_index: usize,
}

/// Summary of a tree pass
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files_processed(&self) -> usize {
        self.written.len() + self.unchanged.len()
    }
}

/// First rule (in caller order) that claims `path`
pub fn select_rule<'r>(path: &Path, rules: &'r [Rule]) -> Option<(usize, &'r Rule)> {
    rules.iter().enumerate().find(|(_, rule)| rule.matches(path))
}

/// Job for `path`, or `None` when no rule claims it
fn job_for(path: &Path, rules: &[Rule]) -> Result<Option<FileJob>> {
    let Some((rule_index, rule)) = select_rule(path, rules) else {
        return Ok(None);
    };
    Ok(Some(FileJob {
        source: path.to_path_buf(),
        destination: rule.destination_for(path)?,
        rule_index,
    }))
}

/// Work out rule selection and destinations without touching the filesystem.
pub fn plan<P: AsRef<Path>>(paths: &[P], rules: &[Rule]) -> Result<Vec<FileJob>> {
    paths
        .iter()
        .filter_map(|path| job_for(path.as_ref(), rules).transpose())
        .collect()
}

/// Rewrite every file claimed by a rule into that rule's destination root.
pub fn unasync_files<P: AsRef<Path>>(paths: &[P], rules: &[Rule]) -> Result<Summary> {
    let mut summary = Summary::new();

    for path in paths {
        let path = path.as_ref();
        let Some(job) = job_for(path, rules)? else {
            debug!(path = %path.display(), "no rule matches, skipping");
            summary.skipped.push(path.to_path_buf());
            continue;
        };

        match rules[job.rule_index].transform_into(&job.source, &job.destination)? {
            FileOutcome::Written => summary.written.push(job.destination),
            FileOutcome::Unchanged => summary.unchanged.push(job.destination),
        }
    }

    info!(
        written = summary.written.len(),
        unchanged = summary.unchanged.len(),
        skipped = summary.skipped.len(),
        "unasync pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new("/src/_async/tests", "/out/tests", [("ahip", "hip")]).unwrap(),
            Rule::new("/src/_async", "/out/_sync", Vec::<(String, String)>::new()).unwrap(),
        ]
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = rules();
        let (index, _) = select_rule(Path::new("/src/_async/tests/t.py"), &rules).unwrap();
        assert_eq!(index, 0);
        let (index, _) = select_rule(Path::new("/src/_async/a.py"), &rules).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_order_is_caller_defined() {
        let mut rules = rules();
        rules.reverse();
        let (index, rule) = select_rule(Path::new("/src/_async/tests/t.py"), &rules).unwrap();
        assert_eq!(index, 0);
        assert_eq!(rule.dest_root(), Path::new("/out/_sync"));
    }

    #[test]
    fn test_plan_skips_unmatched() {
        let jobs = plan(&["/src/_async/a.py", "/elsewhere/b.py", "/src/_async/tests/t.py"], &rules()).unwrap();
        assert_eq!(
            jobs,
            vec![
                FileJob {
                    source: PathBuf::from("/src/_async/a.py"),
                    destination: PathBuf::from("/out/_sync/a.py"),
                    rule_index: 1,
                },
                FileJob {
                    source: PathBuf::from("/src/_async/tests/t.py"),
                    destination: PathBuf::from("/out/tests/t.py"),
                    rule_index: 0,
                },
            ]
        );
    }

    #[test]
    fn test_unmatched_files_are_skipped_silently() {
        let summary = unasync_files(&["/nowhere/x.py"], &rules()).unwrap();
        assert_eq!(summary.skipped, vec![PathBuf::from("/nowhere/x.py")]);
        assert_eq!(summary.files_processed(), 0);
    }

    #[test]
    fn test_unasync_files_writes_planned_destinations() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let src = temp_dir.path().join("_async");
        std::fs::create_dir_all(src.join("tests")).unwrap();
        std::fs::write(src.join("a.py"), "async def a(): pass\n").unwrap();
        std::fs::write(src.join("tests/t.py"), "import ahip\n").unwrap();

        let rules = vec![
            Rule::new(src.join("tests"), temp_dir.path().join("out/tests"), [("ahip", "hip")]).unwrap(),
            Rule::new(&src, temp_dir.path().join("out/_sync"), Vec::<(String, String)>::new()).unwrap(),
        ];
        let paths = [src.join("a.py"), src.join("tests/t.py")];
        let planned: Vec<PathBuf> = plan(&paths, &rules).unwrap().into_iter().map(|job| job.destination).collect();

        let summary = unasync_files(&paths, &rules).unwrap();
        assert_eq!(summary.written, planned);
        assert_eq!(std::fs::read_to_string(&planned[1]).unwrap(), "import hip\n");
    }
}
