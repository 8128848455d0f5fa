//! The demonstration schema: dice, messages and published content.
//!
//! Messages, articles and podcasts live in the [`Store`] handed over through the
//! [`Context`](crate::Context); their reads and writes go through deferred resolvers.

use std::sync::Arc;

use rand::Rng;

use crate::error::ResolverError;
use crate::error::SchemaError;
use crate::execution::FieldResult;
use crate::execution::ResolveInfo;
use crate::execution::Resolver;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::Resolvers;
use crate::spec::Schema;
use crate::store::Store;

const MESSAGES: &str = "messages";
const CONTENT: &str = "content";

const DEFAULT_SIDES: i64 = 6;
const MAX_DICE: usize = 1_000;

/// SDL of the demonstration schema.
pub const SCHEMA: &str = r#"type Query {
  hello: String
  quoteOfTheDay: String
  random: Float!
  rollThreeDice: [Int]
  rollDice(numDice: Int!, numSides: Int = 6): [Int]
  getDie(numSides: Int = 6): RandomDie
  getMessage(id: ID!): Message
  getMessages: [Message]
  getArticle(id: ID!): Article
  feed: [Content]
}

type RandomDie {
  numSides: Int!
  rollOnce: Int!
  roll(numRolls: Int!): [Int]
}

type Mutation {
  createMessage(input: MessageInput): Message
  updateMessage(id: ID!, input: MessageInput): Message
  createArticle(input: ArticleInput!): Article
  createPodcast(input: PodcastInput!): Podcast
}

input MessageInput {
  content: String
  author: String
}

type Message {
  id: ID!
  content: String
  author: String
}

interface Content {
  id: ID!
  title: String
}

type Article implements Content {
  id: ID!
  title: String
  bodyText: String
}

type Podcast implements Content {
  id: ID!
  title: String
  audio: String
}

input ArticleInput {
  title: String
  bodyText: String!
}

input PodcastInput {
  title: String
  audio: String!
}
"#;

/// Builds the demonstration schema with its resolvers bound.
pub fn schema() -> Result<Schema, SchemaError> {
    Schema::parse(SCHEMA, resolvers())
}

/// The runtime bindings of [`SCHEMA`].
pub fn resolvers() -> Resolvers {
    Resolvers::new()
        .field("Query", "hello", Resolver::sync(|_| Ok("Hello world!".into())))
        .field(
            "Query",
            "quoteOfTheDay",
            Resolver::sync(|_| {
                let quote = if rand::rng().random_bool(0.5) {
                    "Take it easy"
                } else {
                    "Salvation lies within"
                };
                Ok(quote.into())
            }),
        )
        .field(
            "Query",
            "random",
            Resolver::sync(|_| Ok(rand::rng().random::<f64>().into())),
        )
        .field(
            "Query",
            "rollThreeDice",
            Resolver::sync(|_| roll(3, DEFAULT_SIDES)),
        )
        .field(
            "Query",
            "rollDice",
            Resolver::sync(|info| roll(info.arg("numDice")?, sides(&info)?)),
        )
        .field(
            "Query",
            "getDie",
            Resolver::sync(|info| {
                let mut die = Object::new();
                die.insert("numSides", sides(&info)?.into());
                Ok(Value::Object(die))
            }),
        )
        .field(
            "RandomDie",
            "rollOnce",
            Resolver::sync(|info| {
                let rolls = roll(1, parent_sides(&info)?)?;
                Ok(rolls
                    .as_array()
                    .and_then(|rolls| rolls.first())
                    .cloned()
                    .unwrap_or_default())
            }),
        )
        .field(
            "RandomDie",
            "roll",
            Resolver::sync(|info| roll(info.arg("numRolls")?, parent_sides(&info)?)),
        )
        .field(
            "Query",
            "getMessage",
            Resolver::deferred(|info| {
                get(info.context.store().clone(), MESSAGES, info.arg("id"))
            }),
        )
        .field(
            "Query",
            "getMessages",
            Resolver::deferred(|info| list(info.context.store().clone(), MESSAGES)),
        )
        .field(
            "Query",
            "getArticle",
            Resolver::deferred(|info| {
                get_article(info.context.store().clone(), info.arg("id"))
            }),
        )
        .field(
            "Query",
            "feed",
            Resolver::deferred(|info| list(info.context.store().clone(), CONTENT)),
        )
        .field(
            "Mutation",
            "createMessage",
            Resolver::deferred(|info| {
                create(info.context.store().clone(), MESSAGES, info.arg("input"))
            }),
        )
        .field(
            "Mutation",
            "updateMessage",
            Resolver::deferred(|info| {
                update(
                    info.context.store().clone(),
                    MESSAGES,
                    info.arg("id"),
                    info.arg("input"),
                )
            }),
        )
        .field(
            "Mutation",
            "createArticle",
            Resolver::deferred(|info| {
                create(info.context.store().clone(), CONTENT, info.arg("input"))
            }),
        )
        .field(
            "Mutation",
            "createPodcast",
            Resolver::deferred(|info| {
                create(info.context.store().clone(), CONTENT, info.arg("input"))
            }),
        )
        .is_type_of("Article", |value| has_field(value, "bodyText"))
        .is_type_of("Podcast", |value| has_field(value, "audio"))
}

fn has_field(value: &Value, field: &str) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.contains_key(field))
}

fn sides(info: &ResolveInfo<'_>) -> Result<i64, ResolverError> {
    Ok(info
        .arg::<Option<i64>>("numSides")?
        .unwrap_or(DEFAULT_SIDES))
}

fn parent_sides(info: &ResolveInfo<'_>) -> Result<i64, ResolverError> {
    info.parent
        .as_object()
        .and_then(|die| die.get("numSides"))
        .and_then(Value::as_i64)
        .ok_or_else(|| ResolverError::new("die has no sides"))
}

fn roll(count: i64, sides: i64) -> FieldResult {
    let count = usize::try_from(count)
        .ok()
        .filter(|count| *count <= MAX_DICE)
        .ok_or_else(|| {
            ResolverError::new(format!(
                "cannot roll {count} dice, the number of dice must be between 0 and {MAX_DICE}"
            ))
        })?;
    if sides < 1 {
        return Err(ResolverError::new(format!(
            "a die needs at least one side, got {sides}"
        )));
    }
    let mut rng = rand::rng();
    Ok(Value::Array(
        (0..count)
            .map(|_| rng.random_range(1..=sides).into())
            .collect(),
    ))
}

async fn get(store: Arc<Store>, collection: &str, id: Result<String, ResolverError>) -> FieldResult {
    Ok(store
        .collection(collection)
        .get(&id?)
        .map(Value::Object)
        .unwrap_or_default())
}

async fn get_article(store: Arc<Store>, id: Result<String, ResolverError>) -> FieldResult {
    let content = get(store, CONTENT, id).await?;
    Ok(if has_field(&content, "bodyText") {
        content
    } else {
        Value::Null
    })
}

async fn list(store: Arc<Store>, collection: &str) -> FieldResult {
    Ok(Value::Array(
        store
            .collection(collection)
            .list()
            .into_iter()
            .map(Value::Object)
            .collect(),
    ))
}

async fn create(
    store: Arc<Store>,
    collection: &str,
    input: Result<Option<Object>, ResolverError>,
) -> FieldResult {
    let record = store
        .collection(collection)
        .create(input?.unwrap_or_default());
    Ok(Value::Object(record))
}

async fn update(
    store: Arc<Store>,
    collection: &str,
    id: Result<String, ResolverError>,
    input: Result<Option<Object>, ResolverError>,
) -> FieldResult {
    let record = store
        .collection(collection)
        .update(&id?, input?.unwrap_or_default())?;
    Ok(Value::Object(record))
}
