//! Command-line commands and their plain-text output.

use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

use recipebox::api::{DataSource, FetchCoordinator, Pagination, Recipe};
use recipebox::cache::{QueryParams, CACHE_TIME_PARAM};
use recipebox::prefs::{self, profile::AVATAR_WARN_BYTES, PreferenceStore, ProfileUpdate, UserProfile};
use recipebox::{use_collection, use_entity};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List recipes
  #[command(alias = "ls")]
  List {
    /// Only recipes in this category
    #[arg(long)]
    category: Option<String>,
    /// Free-text search
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    limit: Option<u64>,
    /// How long this result stays fresh, in milliseconds
    #[arg(long)]
    ttl_ms: Option<u64>,
  },
  /// Show a single recipe
  Show { id: String },
  /// Manage favorite recipes
  #[command(alias = "fav")]
  Favorites {
    #[command(subcommand)]
    action: FavoritesAction,
  },
  /// Show or edit the local profile
  Profile {
    #[command(subcommand)]
    action: ProfileAction,
  },
}

#[derive(Subcommand, Debug)]
pub enum FavoritesAction {
  List,
  Add { id: String },
  Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
  Show,
  Rename { name: String },
  /// Use an image file as avatar
  Avatar { path: PathBuf },
}

pub async fn run<S>(command: Command, coordinator: &FetchCoordinator<S>, store: &dyn PreferenceStore) -> Result<()>
where
  S: DataSource<Item = Recipe>,
{
  match command {
    Command::List {
      category,
      search,
      page,
      limit,
      ttl_ms,
    } => {
      let params = list_params(category, search, page, limit, ttl_ms);
      let mut recipes = use_collection(coordinator, Some(params));
      recipes.settle().await;

      if let Some(error) = recipes.error() {
        return Err(eyre!("{}", error));
      }
      if recipes.items().is_empty() {
        println!("No recipes found");
      }
      for recipe in recipes.items() {
        println!("{}", recipe_line(recipe, prefs::is_favorite(store, &recipe.id)?));
      }
      if let Some(pagination) = recipes.pagination() {
        println!("{}", page_line(pagination));
      }
    }
    Command::Show { id } => {
      let mut recipe = use_entity(coordinator, Some(id.as_str()));
      recipe.settle().await;

      if let Some(error) = recipe.error() {
        return Err(eyre!("{}", error));
      }
      let Some(recipe) = recipe.item() else {
        return Err(eyre!("Recipe {} not found", id));
      };
      print_recipe(recipe, prefs::is_favorite(store, &recipe.id)?);
    }
    Command::Favorites { action } => run_favorites(action, coordinator, store).await?,
    Command::Profile { action } => run_profile(action, store)?,
  }

  Ok(())
}

async fn run_favorites<S>(
  action: FavoritesAction,
  coordinator: &FetchCoordinator<S>,
  store: &dyn PreferenceStore,
) -> Result<()>
where
  S: DataSource<Item = Recipe>,
{
  match action {
    FavoritesAction::List => {
      let recipes = prefs::load_favorites(store, coordinator).await?;
      if recipes.is_empty() {
        println!("No favorites yet");
      }
      for recipe in &recipes {
        println!("{}", recipe_line(recipe, true));
      }
    }
    FavoritesAction::Add { id } => {
      if prefs::add_favorite(store, &id)? {
        println!("Added {} to favorites", id);
      } else {
        println!("{} is already a favorite", id);
      }
    }
    FavoritesAction::Remove { id } => {
      if prefs::remove_favorite(store, &id)? {
        println!("Removed {} from favorites", id);
      } else {
        println!("{} is not a favorite", id);
      }
    }
  }
  Ok(())
}

fn run_profile(action: ProfileAction, store: &dyn PreferenceStore) -> Result<()> {
  let update = match action {
    ProfileAction::Show => {
      print_profile(&prefs::load_profile(store)?);
      return Ok(());
    }
    ProfileAction::Rename { name } => prefs::update_username(store, &name)?,
    ProfileAction::Avatar { path } => {
      let data_url = read_avatar(&path)?;
      prefs::update_avatar(store, &data_url)?
    }
  };

  match update {
    ProfileUpdate::Saved(profile) => {
      print_profile(&profile);
      Ok(())
    }
    ProfileUpdate::Rejected(message) => Err(eyre!(message)),
  }
}

fn list_params(
  category: Option<String>,
  search: Option<String>,
  page: Option<u64>,
  limit: Option<u64>,
  ttl_ms: Option<u64>,
) -> QueryParams {
  let mut params = QueryParams::new();
  if let Some(category) = category {
    params.insert("category", category);
  }
  if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
    params.insert("search", search);
  }
  if let Some(page) = page {
    params.insert("page", page);
  }
  if let Some(limit) = limit {
    params.insert("limit", limit);
  }
  if let Some(ttl_ms) = ttl_ms {
    params.insert(CACHE_TIME_PARAM, ttl_ms);
  }
  params
}

fn read_avatar(path: &Path) -> Result<String> {
  let mime = image_mime(path).ok_or_else(|| eyre!("Unsupported image type: {}", path.display()))?;
  let bytes = std::fs::read(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;

  if bytes.len() as u64 > AVATAR_WARN_BYTES {
    warn!(path = %path.display(), size = bytes.len(), "large avatar");
    eprintln!(
      "warning: {} is larger than {} MiB",
      path.display(),
      AVATAR_WARN_BYTES / (1024 * 1024)
    );
  }

  Ok(prefs::avatar_data_url(mime, &bytes))
}

fn image_mime(path: &Path) -> Option<&'static str> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  match ext.as_str() {
    "png" => Some("image/png"),
    "jpg" | "jpeg" => Some("image/jpeg"),
    "gif" => Some("image/gif"),
    "webp" => Some("image/webp"),
    "svg" => Some("image/svg+xml"),
    _ => None,
  }
}

fn recipe_line(recipe: &Recipe, favorite: bool) -> String {
  let mut line = format!(
    "{} {:>6}  {}",
    if favorite { "*" } else { " " },
    recipe.id,
    recipe.name
  );
  if let Some(category) = &recipe.category {
    line.push_str(&format!("  [{}]", category));
  }
  if let Some(minutes) = recipe.prep_time {
    line.push_str(&format!("  {} min", minutes));
  }
  line
}

fn page_line(pagination: &Pagination) -> String {
  let mut line = match (pagination.page, pagination.total_pages) {
    (Some(page), Some(total)) => format!("Page {} of {}", page, total),
    (Some(page), None) => format!("Page {}", page),
    _ => String::from("Page ?"),
  };
  if let Some(total) = pagination.total {
    line.push_str(&format!(" ({} recipes)", total));
  }
  if pagination.has_next() {
    line.push_str(", more with --page");
  }
  line
}

fn print_recipe(recipe: &Recipe, favorite: bool) {
  println!("{}{}", recipe.name, if favorite { "  *" } else { "" });
  if let Some(category) = &recipe.category {
    println!("Category: {}", category);
  }
  if let Some(minutes) = recipe.prep_time {
    println!("Prep time: {} min", minutes);
  }
  if let Some(description) = &recipe.description {
    println!("\n{}", description);
  }
  if !recipe.ingredients.is_empty() {
    println!("\nIngredients:");
    for ingredient in &recipe.ingredients {
      println!("  - {}", display_value(ingredient));
    }
  }
  if !recipe.steps.is_empty() {
    println!("\nSteps:");
    for (i, step) in recipe.steps.iter().enumerate() {
      println!("  {}. {}", i + 1, display_value(step));
    }
  }
}

fn print_profile(profile: &UserProfile) {
  println!("Username: {}", profile.username);
  match &profile.avatar {
    Some(avatar) => println!("Avatar: set ({} bytes encoded)", avatar.len()),
    None => println!("Avatar: none"),
  }
  if let Some(updated_at) = profile.updated_at {
    println!("Updated: {}", updated_at.format("%Y-%m-%d %H:%M"));
  }
}

fn display_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}
