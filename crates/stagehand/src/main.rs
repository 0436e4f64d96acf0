use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use stagehand_lib::cli::commands::{parse_value, Cli, Commands, ElementTarget, ReferenceAction};
use stagehand_lib::environment::current_username;
use stagehand_lib::{Body, BodyKind, Element, Environment, Project};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger with specified or default log level
    let env = match cli.log_level {
        Some(ref log_level) => Env::default().filter_or("RUST_LOG", log_level),
        None => Env::default().filter_or("RUST_LOG", "info"),
    };
    env_logger::init_from_env(env);

    let environment = match cli.project_dir {
        Some(ref dir) => Environment::load(dir),
        None => Environment::from_env(),
    }
    .with_context(|| "Failed to load project environment")?;

    let project = Project::open(environment).with_context(|| "Failed to open project")?;
    let user = cli.user.clone().or_else(current_username);

    match cli.command {
        Commands::Init => cmd_init(&project),
        Commands::Create {
            kind,
            name,
            description,
            frame_range,
        } => cmd_create(&project, kind, &name, description.as_deref(), frame_range),
        Commands::List {
            kind,
            attr,
            op,
            value,
        } => cmd_list(&project, kind, attr.zip(op).zip(value)),
        Commands::Show { kind, name } => cmd_show(&project, kind, &name),
        Commands::Element { target, create } => cmd_element(&project, &target, create),
        Commands::Publish {
            target,
            file,
            comment,
        } => cmd_publish(&project, &target, &file, &comment, require_user(user)?),
        Commands::Checkout { target } => cmd_checkout(&project, &target, require_user(user)?),
        Commands::Cache {
            target,
            source,
            reference,
        } => cmd_cache(&project, &target, &source, reference),
        Commands::Assign { target, assignee } => cmd_assign(&project, &target, &assignee),
        Commands::Note {
            target,
            text,
            start,
            end,
        } => cmd_note(&project, &target, text.as_deref(), start.as_deref(), end.as_deref()),
        Commands::Reference { action } => cmd_reference(&project, action),
    }
}

fn require_user(user: Option<String>) -> Result<String> {
    user.ok_or_else(|| anyhow::anyhow!("Could not determine the acting user; pass --user"))
}

/// Create the project layout
fn cmd_init(project: &Project) -> Result<()> {
    println!(
        "✓ Initialized project at '{}'",
        project.project_dir().display()
    );
    for kind in BodyKind::ALL {
        println!("  {:<9} {}", kind, kind.root(project.env()).display());
    }
    Ok(())
}

/// Provision a body
fn cmd_create(
    project: &Project,
    kind: BodyKind,
    name: &str,
    description: Option<&str>,
    frame_range: Option<i64>,
) -> Result<()> {
    let mut body = project
        .create_body(kind, name)
        .with_context(|| format!("Failed to create {} '{}'", kind, name))?;

    if let Some(description) = description {
        body.update_description(description)?;
    }
    if let Some(frame_range) = frame_range {
        body.update_frame_range(frame_range)?;
    }

    println!("✓ Created {} '{}'", kind, name);
    println!("  Directory: {}", body.dir().display());
    Ok(())
}

/// List bodies, optionally filtered
fn cmd_list(
    project: &Project,
    kind: BodyKind,
    filter: Option<((String, stagehand_lib::Relation), String)>,
) -> Result<()> {
    let names = match filter {
        Some(((attr, relation), value)) => {
            project.list_bodies_with_relation(kind, &attr, relation, &parse_value(&value))?
        }
        None => project.list_bodies(kind)?,
    };

    if names.is_empty() {
        println!("No {} bodies found.", kind);
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn open_body(project: &Project, kind: BodyKind, name: &str) -> Result<Body> {
    project
        .get_body(kind, name)?
        .ok_or_else(|| anyhow::anyhow!("No {} named '{}'", kind, name))
}

fn open_element(project: &Project, target: &ElementTarget, create: bool) -> Result<Element> {
    let body = open_body(project, target.kind, &target.body)?;
    body.get_element(&target.department, &target.name, create)
        .with_context(|| {
            format!(
                "No element '{}' in {}/{}\nCreate it with: stagehand element {} {} {} --name {} --create",
                target.name,
                target.body,
                target.department,
                target.kind,
                target.body,
                target.department,
                target.name
            )
        })
}

/// Show a body
fn cmd_show(project: &Project, kind: BodyKind, name: &str) -> Result<()> {
    let body = open_body(project, kind, name)?;

    println!("{}", body);
    println!("Description: {}", body.description());
    println!("Frame range: {}", body.frame_range());
    if let Some(camera) = body.camera_number() {
        println!("Camera: {}", camera);
    }
    println!("References: {}", body.references().join(", "));

    for department in stagehand_lib::body::department::ALL {
        let elements = body.list_elements(department)?;
        if !elements.is_empty() {
            println!("  {:<10} {}", department, elements.join(", "));
        }
    }
    Ok(())
}

/// Show an element
fn cmd_element(project: &Project, target: &ElementTarget, create: bool) -> Result<()> {
    let element = open_element(project, target, create)?;

    println!("Element: {}", element.long_name());
    println!("Directory: {}", element.dir().display());
    println!("App extension: {}", element.app_ext());
    println!(
        "Assigned: {}",
        element.assigned_user().unwrap_or("(nobody)")
    );
    println!("Checked out by: {}", element.list_checkout_users().join(", "));
    if let Some(cache) = element.cache_filepath() {
        println!("Cache: {}", cache);
    }
    if let (Some(start), Some(end)) = (element.start_date(), element.end_date()) {
        println!("Schedule: {} to {}", start, end);
    }
    for note in element.list_notes() {
        println!("Note: {}", note);
    }

    if element.list_publishes().is_empty() {
        println!("No publishes yet.");
        return Ok(());
    }
    println!();
    println!("{:<8} {:<12} {:<27} {}", "VERSION", "USER", "TIME", "COMMENT");
    for (version, publish) in element.list_publishes().iter().enumerate() {
        println!(
            "{:<8} {:<12} {:<27} {}",
            version, publish.user, publish.timestamp, publish.comment
        );
    }
    Ok(())
}

/// Publish a file
fn cmd_publish(
    project: &Project,
    target: &ElementTarget,
    file: &Path,
    comment: &str,
    user: String,
) -> Result<()> {
    let mut element = open_element(project, target, true)?;
    info!("Publishing {:?} to {}", file, element.long_name());

    let publish = element
        .publish(&user, file, comment, &target.body)
        .with_context(|| format!("Failed to publish {:?}", file))?;

    println!(
        "✓ Published version {} of {}",
        element.last_version(),
        element.long_name()
    );
    println!("  Current file: {}", publish.filepath);
    Ok(())
}

/// Check an element out
fn cmd_checkout(project: &Project, target: &ElementTarget, user: String) -> Result<()> {
    let mut element = open_element(project, target, false)?;
    let file = element
        .checkout(&user)
        .with_context(|| format!("Failed to check out {}", element.long_name()))?;

    if file.exists() {
        println!("✓ Checked out {} to '{}'", element.long_name(), file.display());
    } else {
        println!(
            "Nothing published for {} yet; working directory is '{}'",
            element.long_name(),
            element.checkout_dir(&user).display()
        );
    }
    Ok(())
}

/// Update an element's cache
fn cmd_cache(
    project: &Project,
    target: &ElementTarget,
    source: &Path,
    reference: bool,
) -> Result<()> {
    let mut element = open_element(project, target, false)?;
    let recorded = element
        .update_cache(source, reference)
        .with_context(|| format!("Failed to update cache from {:?}", source))?;

    println!("✓ Cache of {} is now '{}'", element.long_name(), recorded.display());
    Ok(())
}

/// Assign an element
fn cmd_assign(project: &Project, target: &ElementTarget, assignee: &str) -> Result<()> {
    let mut element = open_element(project, target, false)?;
    element.update_assigned_user(assignee)?;
    println!("✓ Assigned {} to {}", element.long_name(), assignee);
    Ok(())
}

/// Annotate an element
fn cmd_note(
    project: &Project,
    target: &ElementTarget,
    text: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    if text.is_none() && start.is_none() && end.is_none() {
        anyhow::bail!("Nothing to record; give a note, --start or --end");
    }

    let mut element = open_element(project, target, false)?;
    if let Some(text) = text {
        element.update_notes(text)?;
        println!("✓ Added note to {}", element.long_name());
    }
    if let Some(start) = start {
        element.update_start_date(start)?;
        println!("✓ {} starts {}", element.long_name(), start);
    }
    if let Some(end) = end {
        element.update_end_date(end)?;
        println!("✓ {} ends {}", element.long_name(), end);
    }
    Ok(())
}

/// Handle reference subcommands
fn cmd_reference(project: &Project, action: ReferenceAction) -> Result<()> {
    match action {
        ReferenceAction::Add {
            kind,
            body,
            reference,
        } => {
            let mut body = open_body(project, kind, &body)?;
            let added = body
                .add_reference(&reference)
                .with_context(|| format!("Failed to add reference '{}'", reference))?;
            if added {
                println!("✓ {} now references {}", body.name(), reference);
            } else {
                println!("{} already references {}", body.name(), reference);
            }
        }
        ReferenceAction::Remove {
            kind,
            body,
            reference,
        } => {
            let mut body = open_body(project, kind, &body)?;
            if body.remove_reference(&reference)? {
                println!("✓ Removed reference {} from {}", reference, body.name());
            } else {
                println!("{} does not reference {}", body.name(), reference);
            }
        }
        ReferenceAction::List { kind, body } => {
            let body = open_body(project, kind, &body)?;
            if body.references().is_empty() {
                println!("{} has no references.", body.name());
            }
            for reference in body.references() {
                println!("{}", reference);
            }
        }
    }
    Ok(())
}
