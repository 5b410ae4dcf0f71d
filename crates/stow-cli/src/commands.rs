use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use stow_mark::{referenced_packs_in_repository, CancelToken, ReferencedPacks, StowConfig};
use stow_repo::Repository;
use stow_store::{select_snapshots, Snapshot};
use stow_types::SnapshotId;
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli, cancel: CancelToken) -> anyhow::Result<()> {
    match cli.command {
        Command::Init => cmd_init(&cli.repo),
        Command::Snapshots(args) => cmd_snapshots(&cli.repo, cli.format, args),
        Command::ReferencedPacks(args) => {
            let result =
                referenced_packs(&cli.repo, cli.config.as_deref(), args, &cancel).await?;
            print!("{}", render_packs(&result, cli.format)?);
            if cli.format == OutputFormat::Text {
                eprintln!(
                    "{} {} of {} packs referenced by {} snapshot(s), {} blobs in use",
                    "✓".green().bold(),
                    result.packs.len().to_string().bold(),
                    result.total_packs,
                    result.snapshots,
                    result.used_blobs
                );
            }
            Ok(())
        }
    }
}

fn cmd_init(path: &Path) -> anyhow::Result<()> {
    Repository::init(path)
        .with_context(|| format!("cannot initialize repository at {}", path.display()))?;
    println!(
        "{} Initialized stow repository in {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

fn open_repo(path: &Path) -> anyhow::Result<Repository> {
    Repository::open(path).with_context(|| format!("cannot open repository at {}", path.display()))
}

/// Config file settings with command-line overrides applied.
fn load_config(path: Option<&Path>, concurrency: Option<usize>) -> anyhow::Result<StowConfig> {
    let mut config = match path {
        Some(path) => StowConfig::load(path)?,
        None => StowConfig::default(),
    };
    if let Some(n) = concurrency {
        config.mark.concurrency = n;
    }
    debug!(?config, "effective configuration");
    Ok(config)
}

async fn referenced_packs(
    repo_path: &Path,
    config_path: Option<&Path>,
    args: ReferencedPacksArgs,
    cancel: &CancelToken,
) -> anyhow::Result<ReferencedPacks> {
    let config = load_config(config_path, args.concurrency)?;
    let repo = Arc::new(open_repo(repo_path)?);
    let filter = args.filter.into_filter(args.snapshots);
    Ok(referenced_packs_in_repository(repo, &filter, &config.mark, cancel).await?)
}

/// One pack ID per line, or a JSON document with the counters.
fn render_packs(result: &ReferencedPacks, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => result.packs.iter().map(|id| format!("{id}\n")).collect(),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(result)?),
    })
}

#[derive(Serialize)]
struct SnapshotRow<'a> {
    id: SnapshotId,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

fn cmd_snapshots(repo_path: &Path, format: OutputFormat, args: SnapshotsArgs) -> anyhow::Result<()> {
    let repo = open_repo(repo_path)?;
    let all = repo.list_snapshots()?;
    let selected = select_snapshots(&all, &args.filter.into_filter(Vec::new()))?;
    print!("{}", render_snapshots(&selected, format)?);
    Ok(())
}

fn render_snapshots(
    snapshots: &[(SnapshotId, Snapshot)],
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<SnapshotRow<'_>> = snapshots
                .iter()
                .map(|(id, snapshot)| SnapshotRow { id: *id, snapshot })
                .collect();
            Ok(format!("{}\n", serde_json::to_string_pretty(&rows)?))
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for (id, sn) in snapshots {
                out.push_str(&format!(
                    "{}  {}  {}  [{}]  {}\n",
                    id.short_hex().yellow(),
                    sn.time.format("%Y-%m-%d %H:%M:%S"),
                    sn.hostname.bold(),
                    sn.tags.join(","),
                    sn.paths.join(" ")
                ));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use stow_mark::MarkError;
    use stow_pack::PackWriter;
    use stow_store::{Node, Tree};
    use stow_types::{BlobKind, ObjectId, PackId};

    struct Fixture {
        dir: tempfile::TempDir,
        live: PackId,
        dead: PackId,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let chunk = b"chunk".to_vec();
        let root = Tree::new(vec![Node::file("f", 5, vec![ObjectId::from_bytes(&chunk)])]);

        let mut w = PackWriter::new();
        w.add_blob(BlobKind::Tree, &root.encode().unwrap());
        w.add_blob(BlobKind::Data, &chunk);
        let live = repo.save_pack(w).unwrap().id;

        let mut w = PackWriter::new();
        w.add_blob(BlobKind::Data, b"garbage");
        let dead = repo.save_pack(w).unwrap().id;

        let sn = Snapshot::new(root.id().unwrap(), "alpha", vec!["/data".into()])
            .with_tags(vec!["daily".into()]);
        repo.save_snapshot(&sn).unwrap();
        Fixture { dir, live, dead }
    }

    fn args(snapshots: &[&str]) -> ReferencedPacksArgs {
        ReferencedPacksArgs {
            snapshots: snapshots.iter().map(|s| s.to_string()).collect(),
            filter: FilterArgs::default(),
            concurrency: None,
        }
    }

    #[test]
    fn init_creates_repository() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        assert!(Repository::open(dir.path()).is_ok());
        assert!(cmd_init(dir.path()).is_err());
    }

    #[tokio::test]
    async fn referenced_packs_of_all_snapshots() {
        let fx = fixture();
        let result = referenced_packs(fx.dir.path(), None, args(&[]), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.packs, BTreeSet::from([fx.live]));
        assert!(!result.packs.contains(&fx.dead));
        assert_eq!(result.total_packs, 2);

        let text = render_packs(&result, OutputFormat::Text).unwrap();
        assert_eq!(text, format!("{}\n", fx.live.to_hex()));
    }

    #[tokio::test]
    async fn latest_selects_the_only_snapshot() {
        let fx = fixture();
        let result = referenced_packs(fx.dir.path(), None, args(&["latest"]), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.snapshots, 1);
    }

    #[tokio::test]
    async fn filter_excluding_everything_keeps_nothing() {
        let fx = fixture();
        let mut a = args(&[]);
        a.filter.hosts = vec!["nobody".into()];
        let result = referenced_packs(fx.dir.path(), None, a, &CancelToken::new())
            .await
            .unwrap();
        assert!(result.packs.is_empty());
        assert_eq!(render_packs(&result, OutputFormat::Text).unwrap(), "");
    }

    #[tokio::test]
    async fn json_output_lists_packs_and_counters() {
        let fx = fixture();
        let result = referenced_packs(fx.dir.path(), None, args(&[]), &CancelToken::new())
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&render_packs(&result, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["packs"][0], fx.live.to_hex());
        assert_eq!(json["total_packs"], 2);
    }

    #[tokio::test]
    async fn config_file_and_override() {
        let fx = fixture();
        let path = fx.dir.path().join("stow.toml");
        std::fs::write(&path, "[mark]\nconcurrency = 2\n").unwrap();
        assert_eq!(load_config(Some(&path), None).unwrap().mark.concurrency, 2);
        assert_eq!(load_config(Some(&path), Some(5)).unwrap().mark.concurrency, 5);

        let mut a = args(&[]);
        a.concurrency = Some(1);
        let result = referenced_packs(fx.dir.path(), Some(&path), a, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.packs, BTreeSet::from([fx.live]));
    }

    #[tokio::test]
    async fn missing_repository_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = referenced_packs(dir.path(), None, args(&[]), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot open repository"));
    }

    #[tokio::test]
    async fn cancelled_run_reports_cancellation() {
        let fx = fixture();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = referenced_packs(fx.dir.path(), None, args(&[]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<MarkError>(), Some(MarkError::Cancelled)));
    }

    #[test]
    fn snapshot_listing_formats() {
        let fx = fixture();
        let repo = Repository::open(fx.dir.path()).unwrap();
        let all = repo.list_snapshots().unwrap();

        let text = render_snapshots(&all, OutputFormat::Text).unwrap();
        assert!(text.contains("alpha"));
        assert!(text.contains("/data"));

        let json: serde_json::Value =
            serde_json::from_str(&render_snapshots(&all, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json[0]["id"], all[0].0.to_hex());
        assert_eq!(json[0]["hostname"], "alpha");
        assert_eq!(json[0]["tags"][0], "daily");
    }
}
