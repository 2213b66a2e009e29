//! People commands for managing the staff and student registry.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};

use attend_core::{NewPerson, Person, PersonCategory, PersonDetails, PersonUpdate, ScanCode};
use attend_db::Database;

#[derive(Debug, Subcommand)]
pub enum PeopleAction {
    /// Register a staff member or student.
    Add(AddArgs),
    /// List registered people.
    List(ListArgs),
    /// Edit a person's details. The scan code never changes.
    Edit(EditArgs),
    /// Remove a person. Their recorded events are kept.
    Remove(RemoveArgs),
}

/// Optional registry details shared by `add` and `edit`.
#[derive(Debug, Default, Args)]
pub struct DetailArgs {
    /// Employee or student number.
    #[arg(long)]
    pub registration_number: Option<String>,
    /// Class or homeroom.
    #[arg(long = "class")]
    pub class_name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

impl DetailArgs {
    /// Details as given, for edits where a blank value clears the field.
    fn raw(&self) -> PersonDetails {
        PersonDetails {
            registration_number: self.registration_number.clone(),
            class_name: self.class_name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
        }
    }

    /// Details with blank values dropped, for new registrations.
    fn trimmed(&self) -> PersonDetails {
        let keep = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        PersonDetails {
            registration_number: keep(&self.registration_number),
            class_name: keep(&self.class_name),
            phone: keep(&self.phone),
            email: keep(&self.email),
            address: keep(&self.address),
        }
    }
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Registry to add to: staff or student.
    #[arg(long)]
    pub category: PersonCategory,
    /// Display name.
    #[arg(long)]
    pub name: String,
    /// Scan code to assign (a new one is issued when omitted).
    #[arg(long)]
    pub code: Option<String>,
    #[command(flatten)]
    pub details: DetailArgs,
    /// Print the registered person as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only list one registry: staff or student.
    #[arg(long)]
    pub category: Option<PersonCategory>,
    /// Print the list as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Registry identifier (see `people list`).
    pub id: i64,
    /// New display name.
    #[arg(long)]
    pub name: Option<String>,
    /// Pass an empty value to clear a detail.
    #[command(flatten)]
    pub details: DetailArgs,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Registry identifier (see `people list`).
    pub id: i64,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, action: &PeopleAction) -> Result<()> {
    match action {
        PeopleAction::Add(args) => add(writer, db, args),
        PeopleAction::List(args) => list(writer, db, args),
        PeopleAction::Edit(args) => edit(writer, db, args),
        PeopleAction::Remove(args) => remove(writer, db, args),
    }
}

fn add<W: Write>(writer: &mut W, db: &mut Database, args: &AddArgs) -> Result<()> {
    let code = args
        .code
        .as_deref()
        .map(ScanCode::new)
        .transpose()
        .context("invalid scan code")?;
    let new_person = NewPerson::new(&args.name, args.category, code, args.details.trimmed())?;
    let person = db.add_person(&new_person)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&person)?)?;
    } else {
        writeln!(
            writer,
            "Registered {} {} (#{}) with code {}",
            person.category.label(),
            person.name,
            person.id,
            person.code
        )?;
    }
    Ok(())
}

fn list<W: Write>(writer: &mut W, db: &Database, args: &ListArgs) -> Result<()> {
    let people = db.list_people(args.category)?;
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&people)?)?;
    } else {
        write!(writer, "{}", format_people(&people))?;
    }
    Ok(())
}

fn edit<W: Write>(writer: &mut W, db: &mut Database, args: &EditArgs) -> Result<()> {
    let update = PersonUpdate {
        name: args.name.clone(),
        details: args.details.raw(),
    };
    if update.is_empty() {
        bail!("nothing to update; pass --name or a detail flag");
    }

    let person = db.update_person(args.id, &update)?;
    writeln!(writer, "Updated #{} {}", person.id, person.name)?;
    Ok(())
}

fn remove<W: Write>(writer: &mut W, db: &mut Database, args: &RemoveArgs) -> Result<()> {
    let person = db.remove_person(args.id)?;
    writeln!(
        writer,
        "Removed {} {} (#{}, code {}). Recorded events are kept.",
        person.category.label(),
        person.name,
        person.id,
        person.code
    )?;
    Ok(())
}

/// Formats the registry as a table.
pub fn format_people(people: &[Person]) -> String {
    let mut output = String::new();
    if people.is_empty() {
        writeln!(output, "No people registered.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<4}  {:<8}  {:<12}  {:<10}  Name",
        "ID", "Category", "Code", "Class"
    )
    .unwrap();
    for person in people {
        writeln!(
            output,
            "{:<4}  {:<8}  {:<12}  {:<10}  {}",
            person.id,
            person.category.label(),
            person.code,
            person.details.class_name.as_deref().unwrap_or("-"),
            person.name
        )
        .unwrap();
    }
    output
}

/// Formats one person with their details.
pub fn format_person(person: &Person) -> String {
    let mut output = String::new();
    writeln!(
        output,
        "#{} {} ({})",
        person.id,
        person.name,
        person.category.label()
    )
    .unwrap();

    let details = &person.details;
    let code = person.code.to_string();
    let fields = [
        ("code", Some(&code)),
        ("registration", details.registration_number.as_ref()),
        ("class", details.class_name.as_ref()),
        ("phone", details.phone.as_ref()),
        ("email", details.email.as_ref()),
        ("address", details.address.as_ref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            writeln!(output, "  {:<13} {value}", format!("{label}:")).unwrap();
        }
    }
    output
}
