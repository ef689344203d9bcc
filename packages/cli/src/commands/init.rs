use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

const SAMPLE_TEMPLATES: &str = r#"{
  "connectors": [
    { "id": "cnctrVarName", "defaultNodeId": "idVarName", "fixed": true },
    { "id": "cnctrExp", "defaultNodeId": "idEmptyExp", "class": "exp" },
    { "id": "cnctrPlaceholder", "defaultNodeId": "idEmptyExp" }
  ],
  "nodes": [
    {
      "id": "idVarDecl",
      "type": "connective",
      "name": "VarDecl",
      "connectors": [
        {
          "connector": "cnctrVarName",
          "name": "Name",
          "imitationId": "imitIdVarName",
          "imitationConnectionPos": "imitCnctPosName"
        },
        { "connector": "cnctrExp", "name": "Init" }
      ],
      "imitations": { "imitIdManual": "idVar" },
      "canCreateImitManually": true
    },
    {
      "id": "idVar",
      "type": "connective",
      "name": "Var",
      "connectors": [
        { "connector": "cnctrPlaceholder", "name": "Name", "imitationConnectionPos": "imitCnctPosName" }
      ]
    },
    {
      "id": "idVarName",
      "type": "text",
      "name": "VarName",
      "text": "x",
      "imitations": { "imitIdVarName": "idVarRef" }
    },
    { "id": "idVarRef", "type": "text", "name": "VarRef" },
    { "id": "idEmptyExp", "type": "void", "name": "EmptyExp" }
  ]
}
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing BunnyHop project...".bright_blue().bold());

    let template_dir = PathBuf::from(cwd).join("templates");
    if !template_dir.exists() {
        fs::create_dir_all(&template_dir)?;
        println!("  {} Created templates/", "✓".green());
    }

    let sample = template_dir.join("basic.json");
    if !sample.exists() {
        fs::write(&sample, SAMPLE_TEMPLATES)?;
        println!("  {} Created templates/basic.json", "✓".green());
    }

    let config_json = serde_json::to_string_pretty(&Config::default())?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit templates/basic.json");
    println!("  2. Run: bunnyhop check");
    println!("  3. Run: bunnyhop tree idVarDecl --imitate");

    Ok(())
}
