//! Init command handler

use crate::commands::InitArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use std::path::{Path, PathBuf};

/// Sample document exercising hooks, `run`, `forEach` and frames
pub const EXAMPLE_DOCUMENT: &str = r##"{
  "describe": {
    "text": "Example feature",
    "url": "/",
    "before": "../hooks/before-example.json",
    "search": {
      "title": "searches and opens every result",
      "actions": [
        { "run": "token", "as": "authToken" },
        { "type": "faker.internet.email()", "loc": "#email" },
        { "click": "button > Search" },
        { "exist": "#results", "forEach": {
            "items": "#results li",
            "actions": [
              { "getText": "a" },
              { "expectVisible": { "loc": "a" } }
            ]
        } },
        { "expectText": { "loc": "#token", "equals": "{authToken}" } }
      ]
    },
    "embedded": {
      "title": "reads text inside nested frames",
      "url": "/embedded",
      "actions": [
        { "expectText": { "loc": "h1", "contains": "Welcome" }, "frame": ["#outer", "#inner"] },
        { "screenshot": { "path": "screenshots/embedded.png", "fullPage": true } }
      ]
    }
  }
}
"##;

/// Sample hook document referenced from `before`
pub const BEFORE_DOCUMENT: &str = r##"{
  "describe": {
    "text": "Shared setup",
    "url": "/login",
    "login": {
      "title": "signs in",
      "actions": [
        { "type": "demo", "loc": "#user" },
        { "type": "secret", "loc": "#password" },
        { "press": "Enter" },
        { "expectUrl": { "contains": "/home" } }
      ]
    }
  }
}
"##;

/// Sample function bag
pub const FUNCTION_BAG: &str = r#"# Functions available to the `run` action.
token:
  value: "demo-token"
today:
  command: date
  args: ["+%Y-%m-%d"]
"#;

/// Files written by `init`, relative to the project directory
#[must_use]
pub fn scaffold_files() -> [(PathBuf, &'static str); 3] {
    [
        (PathBuf::from("fixtures/example.json"), EXAMPLE_DOCUMENT),
        (PathBuf::from("hooks/before-example.json"), BEFORE_DOCUMENT),
        (PathBuf::from("help/plugin-func.yaml"), FUNCTION_BAG),
    ]
}

/// Write the scaffold, returning the files created
pub fn scaffold(root: &Path, force: bool) -> CliResult<Vec<PathBuf>> {
    let mut created = Vec::new();
    for (relative, content) in scaffold_files() {
        let path = root.join(relative);
        if path.exists() && !force {
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        created.push(path);
    }
    Ok(created)
}

/// Execute the init command
pub fn execute_init(config: &CliConfig, args: &InitArgs) -> CliResult<()> {
    let created = scaffold(&args.path, args.force)?;
    if config.verbosity.is_quiet() {
        return Ok(());
    }
    if created.is_empty() {
        println!(
            "Nothing to do in {} (use --force to overwrite)",
            args.path.display()
        );
        return Ok(());
    }
    for path in &created {
        println!("Created: {}", path.display());
    }
    println!("Run `jsonwright run {}` to try it", args.path.join("fixtures").display());
    Ok(())
}
