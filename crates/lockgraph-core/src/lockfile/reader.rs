//! Lockfile reader.
//!
//! Turns lockfile text into a [`LockedGraph`]. Source sections (`GEM`,
//! `GIT`, `PATH`) use fixed indentation:
//!
//! ```text
//! GIT
//!   remote: https://github.com/org/repo.git
//!   revision: 4f1c2e0
//!   branch: main
//!   specs:
//!     name (1.0.0)
//!       dep (>= 1.0, < 2)
//! ```

use std::sync::Arc;

use super::diagnostics::{Diagnostic, Diagnostics};
use super::error::LockfileError;
use super::origin::{GitReference, GitSource, PackageOrigin, PathSource, RefKind};
use super::sections::{BodyLine, Section, parse_sections};
use super::types::{Dependency, LockedGraph, LockedPackage, is_package_name};
use crate::catalog::{CatalogFactory, WorkPool, build_catalogs};

const KEY_INDENT: usize = 2;
const SPEC_INDENT: usize = 4;
const DEPENDENCY_INDENT: usize = 6;

/// Parse lockfile text into a graph.
///
/// Unknown sections are reported through `diagnostics` and skipped.
/// Catalog handles are not constructed; see [`load_lockfile`].
pub fn parse_lockfile(
    text: &str,
    diagnostics: &mut Diagnostics,
) -> Result<LockedGraph, LockfileError> {
    let sections = parse_sections(text)?;
    let mut graph = LockedGraph::new();

    for section in &sections {
        match section.label.as_str() {
            "GEM" | "PATH" | "GIT" => parse_source_section(section, &mut graph, diagnostics)?,
            "PLATFORMS" => {
                graph.platforms.extend(list_values(section)?);
            }
            "DEPENDENCIES" => {
                graph.dependencies.extend(
                    list_values(section)?
                        .into_iter()
                        .map(|dep| dep.strip_suffix('!').map(str::to_string).unwrap_or(dep)),
                );
            }
            "RUBY VERSION" => graph.ruby_version = first_value(section),
            "BUNDLED WITH" => graph.bundler_version = first_value(section),
            _ => diagnostics.push(Diagnostic::UnknownSection {
                label: section.label.clone(),
                line: section.line,
            }),
        }
    }

    tracing::debug!(
        sections = sections.len(),
        packages = graph.package_count(),
        remotes = graph.registry_remotes.len(),
        "parsed lockfile"
    );

    Ok(graph)
}

/// Parse lockfile text and construct a catalog handle for every registry
/// remote on `pool`.
///
/// Waits for handle construction only. A handle that fails to construct is
/// recorded against its remote in [`LockedGraph::server_catalogs`].
pub async fn load_lockfile(
    text: &str,
    diagnostics: &mut Diagnostics,
    factory: Arc<dyn CatalogFactory>,
    pool: &WorkPool,
) -> Result<LockedGraph, LockfileError> {
    let mut graph = parse_lockfile(text, diagnostics)?;
    let remotes: Vec<String> = graph.registry_remotes.iter().cloned().collect();
    let catalogs = build_catalogs(remotes, factory, pool).await;
    graph.set_server_catalogs(catalogs);
    Ok(graph)
}

/// Body lines of a list section (`PLATFORMS`, `DEPENDENCIES`).
fn list_values(section: &Section) -> Result<Vec<String>, LockfileError> {
    section
        .body
        .iter()
        .map(|line| {
            if line.indent == KEY_INDENT {
                Ok(line.text.clone())
            } else {
                Err(LockfileError::format(line.line, &section.label, &line.raw))
            }
        })
        .collect()
}

/// Single value of `RUBY VERSION` / `BUNDLED WITH`.
fn first_value(section: &Section) -> Option<String> {
    section.body.first().map(|line| line.text.clone())
}

struct PendingPackage {
    name: String,
    version: String,
    platform: Option<String>,
    dependencies: Vec<Dependency>,
}

#[derive(Default)]
struct SourceFields {
    remotes: Vec<String>,
    revision: Option<String>,
    reference: Option<GitReference>,
}

fn parse_source_section(
    section: &Section,
    graph: &mut LockedGraph,
    diagnostics: &mut Diagnostics,
) -> Result<(), LockfileError> {
    let label = section.label.as_str();
    let mut fields = SourceFields::default();
    let mut packages: Vec<PendingPackage> = Vec::new();
    let mut in_specs = false;

    for line in &section.body {
        match line.indent {
            KEY_INDENT => {
                if line.text == "specs:" {
                    in_specs = true;
                    continue;
                }
                in_specs = false;
                parse_key_line(label, line, &mut fields, diagnostics)?;
            }
            SPEC_INDENT if in_specs => {
                let (name, version, platform) = parse_spec_entry(&line.text)
                    .ok_or_else(|| LockfileError::format(line.line, label, &line.raw))?;
                packages.push(PendingPackage {
                    name,
                    version,
                    platform,
                    dependencies: Vec::new(),
                });
            }
            DEPENDENCY_INDENT if in_specs => {
                let dependency = parse_dependency(&line.text);
                match (packages.last_mut(), dependency) {
                    (Some(package), Some(dependency)) => package.dependencies.push(dependency),
                    _ => return Err(LockfileError::format(line.line, label, &line.raw)),
                }
            }
            _ => return Err(LockfileError::format(line.line, label, &line.raw)),
        }
    }

    let origin = match label {
        "GEM" => {
            graph.registry_remotes.extend(fields.remotes);
            PackageOrigin::Registry
        }
        "GIT" => {
            let remote = fields.remotes.pop().ok_or_else(|| missing(section, "remote"))?;
            let revision = fields.revision.ok_or_else(|| missing(section, "revision"))?;
            PackageOrigin::Git(GitSource {
                remote,
                revision,
                reference: fields.reference,
            })
        }
        _ => {
            let location = fields.remotes.pop().ok_or_else(|| missing(section, "remote"))?;
            PackageOrigin::Path(PathSource::new(location))
        }
    };

    for pending in packages {
        let mut package = LockedPackage::new(pending.name, pending.version, origin.clone())
            .with_dependencies(pending.dependencies);
        if let Some(platform) = pending.platform {
            package = package.with_platform(platform);
        }
        graph.add_package(package)?;
    }

    Ok(())
}

fn parse_key_line(
    label: &str,
    line: &BodyLine,
    fields: &mut SourceFields,
    diagnostics: &mut Diagnostics,
) -> Result<(), LockfileError> {
    let invalid = || LockfileError::format(line.line, label, &line.raw);
    let (key, value) = line.text.split_once(": ").ok_or_else(invalid)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid());
    }

    match key {
        // GEM may list several remotes; GIT and PATH exactly one
        "remote" if label == "GEM" || fields.remotes.is_empty() => {
            fields.remotes.push(value.to_string());
        }
        "revision" if label == "GIT" && fields.revision.is_none() => {
            fields.revision = Some(value.to_string());
        }
        "remote" | "revision" => return Err(invalid()),
        _ => match RefKind::from_key(key) {
            Some(kind) if label == "GIT" && fields.reference.is_none() => {
                fields.reference = Some(GitReference {
                    kind,
                    value: value.to_string(),
                });
            }
            Some(_) => return Err(invalid()),
            // Extra source options such as `glob:` or `submodules:`
            None if label != "GEM" && is_option_key(key) => {
                diagnostics.push(Diagnostic::IgnoredKey {
                    section: label.to_string(),
                    key: key.to_string(),
                    line: line.line,
                });
            }
            None => return Err(invalid()),
        },
    }
    Ok(())
}

fn is_option_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn missing(section: &Section, key: &'static str) -> LockfileError {
    LockfileError::MissingKey {
        line: section.line,
        section: section.label.clone(),
        key,
    }
}

/// Parse a `specs:` entry: `name (version)` or `name (version-platform)`.
fn parse_spec_entry(text: &str) -> Option<(String, String, Option<String>)> {
    let (name, rest) = text.split_once(" (")?;
    let inner = rest.strip_suffix(')')?;
    if !is_package_name(name) || inner.is_empty() || inner.contains([' ', '(', ')']) {
        return None;
    }

    let (version, platform) = split_version_platform(inner);
    Some((name.to_string(), version.to_string(), platform.map(str::to_string)))
}

/// Split `version[-platform]` text.
///
/// The platform starts after the first `-` that is followed by a non-digit
/// character, so `1.13.0-x86_64-linux` gives (`1.13.0`, `x86_64-linux`) and
/// `2.0-1` stays a plain version. A prerelease written with a hyphen
/// (`1.0.0-rc1`) is read as a platform; such versions still serialize back to
/// the same text.
pub fn split_version_platform(text: &str) -> (&str, Option<&str>) {
    for (idx, _) in text.match_indices('-') {
        let suffix = &text[idx + 1..];
        let starts_non_digit = suffix
            .chars()
            .next()
            .is_some_and(|c| !c.is_ascii_digit());
        if idx > 0 && starts_non_digit {
            return (&text[..idx], Some(suffix));
        }
    }
    (text, None)
}

/// Parse a dependency line: `name` or `name (c1, c2, ...)`.
fn parse_dependency(text: &str) -> Option<Dependency> {
    let Some((name, rest)) = text.split_once(" (") else {
        return is_package_name(text).then(|| Dependency::new(text));
    };

    let inner = rest.strip_suffix(')')?;
    if !is_package_name(name) || inner.contains(['(', ')']) {
        return None;
    }

    let constraints = inner
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Some(Dependency {
        name: name.to_string(),
        constraints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LockedGraph {
        let mut diagnostics = Diagnostics::new();
        let graph = parse_lockfile(text, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
        graph
    }

    fn parse_err(text: &str) -> LockfileError {
        parse_lockfile(text, &mut Diagnostics::new()).unwrap_err()
    }

    #[test]
    fn test_empty_text() {
        let graph = parse("");
        assert!(graph.is_empty());
        assert!(graph.platforms.is_empty());
        assert!(graph.dependencies.is_empty());
    }

    #[test]
    fn test_split_version_platform() {
        assert_eq!(split_version_platform("1.0.0"), ("1.0.0", None));
        assert_eq!(split_version_platform("1.0.0-java"), ("1.0.0", Some("java")));
        assert_eq!(
            split_version_platform("1.13.0-x86_64-linux"),
            ("1.13.0", Some("x86_64-linux"))
        );
        assert_eq!(
            split_version_platform("1.15.4-arm64-darwin"),
            ("1.15.4", Some("arm64-darwin"))
        );
        assert_eq!(split_version_platform("2.0-1"), ("2.0-1", None));
        assert_eq!(
            split_version_platform("2.0-1-x64-mingw32"),
            ("2.0-1", Some("x64-mingw32"))
        );
        assert_eq!(split_version_platform("1.0.0-rc1"), ("1.0.0", Some("rc1")));
        assert_eq!(split_version_platform("-java"), ("-java", None));
        assert_eq!(split_version_platform("1.0-"), ("1.0-", None));
    }

    #[test]
    fn test_parse_spec_entry() {
        assert_eq!(
            parse_spec_entry("rack (3.0.8)"),
            Some(("rack".to_string(), "3.0.8".to_string(), None))
        );
        assert_eq!(
            parse_spec_entry("nokogiri (1.15.4-x86_64-linux)"),
            Some((
                "nokogiri".to_string(),
                "1.15.4".to_string(),
                Some("x86_64-linux".to_string())
            ))
        );
        assert_eq!(parse_spec_entry("rack"), None);
        assert_eq!(parse_spec_entry("rack ()"), None);
        assert_eq!(parse_spec_entry("rack (1.0"), None);
        assert_eq!(parse_spec_entry("two words (1.0)"), None);
    }

    #[test]
    fn test_parse_dependency() {
        assert_eq!(parse_dependency("rake"), Some(Dependency::new("rake")));
        assert_eq!(
            parse_dependency("rack (>= 2.2.4, < 4)"),
            Some(
                Dependency::new("rack")
                    .with_constraint(">= 2.2.4")
                    .with_constraint("< 4")
            )
        );
        assert_eq!(parse_dependency("rack (>= 1"), None);
        assert_eq!(parse_dependency("not a name"), None);
    }

    #[test]
    fn test_registry_section() {
        let graph = parse(
            "GEM\n  remote: https://rubygems.org/\n  remote: https://gems.example.com/\n  specs:\n    actionpack (7.1.0)\n      rack (>= 2.2.4)\n      rack-test (>= 0.6.3)\n    rack (3.0.8)\n",
        );

        assert_eq!(graph.registry_remotes.len(), 2);
        assert!(graph.registry_remotes.contains("https://gems.example.com/"));
        let actionpack = graph.get_package("actionpack", None).unwrap();
        assert!(actionpack.origin().is_registry());
        assert_eq!(actionpack.dependencies().len(), 2);
        assert_eq!(actionpack.dependencies()[1].name, "rack-test");
        assert!(graph.owns(actionpack));
        assert!(graph.get_package("rack", None).unwrap().dependencies().is_empty());
    }

    #[test]
    fn test_empty_specs_is_legal() {
        let graph = parse("GEM\n  remote: https://rubygems.org/\n  specs:\n");
        assert_eq!(graph.package_count(), 0);
        assert_eq!(graph.registry_remotes.len(), 1);
    }

    #[test]
    fn test_git_section() {
        let graph = parse(
            "GIT\n  remote: git://x\n  revision: abc123\n  tag: v0.1.0\n  specs:\n    gamma (0.1.0)\n",
        );

        let gamma = graph.get_package("gamma", None).unwrap();
        let git = gamma.origin().as_git().unwrap();
        assert_eq!(git.remote, "git://x");
        assert_eq!(git.revision, "abc123");
        assert_eq!(
            git.reference,
            Some(GitReference {
                kind: RefKind::Tag,
                value: "v0.1.0".to_string()
            })
        );
        assert!(graph.registry_remotes.is_empty());
    }

    #[test]
    fn test_path_section() {
        let graph = parse("PATH\n  remote: .\n  specs:\n    myapp (0.1.0)\n      rake\n");
        let myapp = graph.get_package("myapp", None).unwrap();
        assert_eq!(myapp.origin().as_path().unwrap().location, ".");
        assert_eq!(myapp.dependencies(), &[Dependency::new("rake")]);
    }

    #[test]
    fn test_list_and_value_sections() {
        let graph = parse(
            "PLATFORMS\n  x86_64-linux\n  arm64-darwin\n\nDEPENDENCIES\n  gamma!\n  rails (~> 7.1)\n\nRUBY VERSION\n   ruby 3.2.2p53\n\nBUNDLED WITH\n   2.4.10\n",
        );

        assert_eq!(graph.platforms, vec!["x86_64-linux", "arm64-darwin"]);
        assert_eq!(graph.dependencies, vec!["gamma", "rails (~> 7.1)"]);
        assert_eq!(graph.ruby_version.as_deref(), Some("ruby 3.2.2p53"));
        assert_eq!(graph.bundler_version.as_deref(), Some("2.4.10"));
    }

    #[test]
    fn test_unknown_section_is_a_warning() {
        let mut diagnostics = Diagnostics::new();
        let graph = parse_lockfile(
            "CHECKSUMS\n  rack (3.0.8) sha256=abc\n\nPLATFORMS\n  ruby\n",
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(graph.platforms, vec!["ruby"]);
        assert_eq!(
            diagnostics.into_vec(),
            vec![Diagnostic::UnknownSection {
                label: "CHECKSUMS".to_string(),
                line: 1,
            }]
        );
    }

    #[test]
    fn test_unexpected_lines_are_format_errors() {
        let err = parse_err("GEM\n  specs:\n    rack 3.0.8\n");
        assert_eq!(err, LockfileError::format(3, "GEM", "    rack 3.0.8"));

        let err = parse_err("GEM\n  mirror: https://x/\n");
        assert_eq!(err.line(), Some(2));

        let err = parse_err("GEM\n  specs:\n      rake\n");
        assert_eq!(err.line(), Some(3));

        let err = parse_err("GEM\n    rack (1.0)\n");
        assert_eq!(err.line(), Some(2));

        let err = parse_err("PLATFORMS\n    ruby\n");
        assert_eq!(err.line(), Some(2));

        let err = parse_err("PATH\n  remote: .\n  branch: main\n");
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_extra_source_options_are_ignored() {
        let mut diagnostics = Diagnostics::new();
        let graph = parse_lockfile(
            "GIT\n  remote: git://x\n  revision: abc123\n  glob: *.gemspec\n  submodules: true\n  specs:\n    gamma (0.1.0)\n\nPATH\n  remote: vendor/local\n  glob: local.gemspec\n  specs:\n    local (1.0)\n",
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(graph.package_count(), 2);
        assert_eq!(
            graph.get_package("gamma", None).unwrap().origin(),
            &PackageOrigin::git("git://x", "abc123")
        );
        assert_eq!(
            diagnostics.into_vec(),
            vec![
                Diagnostic::IgnoredKey {
                    section: "GIT".to_string(),
                    key: "glob".to_string(),
                    line: 4,
                },
                Diagnostic::IgnoredKey {
                    section: "GIT".to_string(),
                    key: "submodules".to_string(),
                    line: 5,
                },
                Diagnostic::IgnoredKey {
                    section: "PATH".to_string(),
                    key: "glob".to_string(),
                    line: 11,
                },
            ]
        );
    }

    #[test]
    fn test_malformed_source_options_are_errors() {
        let err = parse_err("GIT\n  remote: git://x\n  revision: abc\n  glob *.gemspec\n");
        assert_eq!(err.line(), Some(4));

        let err = parse_err("GIT\n  remote: git://x\n  revision: abc\n  glob:\n");
        assert_eq!(err.line(), Some(4));

        let err = parse_err("PATH\n  remote: .\n  some option: x\n");
        assert_eq!(err.line(), Some(3));

        let err = parse_err("GEM\n  glob: *.gemspec\n");
        assert_eq!(err, LockfileError::format(2, "GEM", "  glob: *.gemspec"));
    }

    #[test]
    fn test_git_requires_single_remote_and_revision() {
        let err = parse_err("GIT\n  remote: git://x\n  specs:\n    gamma (0.1.0)\n");
        assert_eq!(
            err,
            LockfileError::MissingKey {
                line: 1,
                section: "GIT".to_string(),
                key: "revision",
            }
        );

        let err = parse_err("GIT\n  remote: git://x\n  remote: git://y\n  revision: abc\n");
        assert_eq!(err.line(), Some(3));

        let err = parse_err("PATH\n  specs:\n    local (1.0)\n");
        assert!(matches!(err, LockfileError::MissingKey { key: "remote", .. }));
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let err = parse_err("GEM\n  specs:\n    rack (3.0.8)\n    rack (3.0.9)\n");
        assert!(matches!(err, LockfileError::DuplicatePackage { .. }));
    }

    #[test]
    fn test_platform_variants_share_a_name() {
        let graph = parse(
            "GEM\n  specs:\n    nokogiri (1.15.4-arm64-darwin)\n      racc (~> 1.4)\n    nokogiri (1.15.4-x86_64-linux)\n      racc (~> 1.4)\n",
        );
        let variants = graph.packages_named("nokogiri");
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].platform(), Some("arm64-darwin"));
        assert_eq!(variants[1].full_version(), "1.15.4-x86_64-linux");
    }
}
