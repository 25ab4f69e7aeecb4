//! LOA Lead Qualification & AI Orchestration API Library
//!
//! Scores inbound sales leads, fans content-generation prompts out to
//! several LLM providers (OpenAI, Gemini, DeepSeek), and composes the
//! results with catalog metadata into a single artifact.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Domain logic (scoring, orchestration, composition).
//! - `integrations`: External service clients.
//! - `app`: Router assembly.
//! - `catalog`: Services, packages, licenses and pricing tiers.
//! - `circuit_breaker`: Per-provider circuit breakers.
//! - `composer`: Artifact composition.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `fingerprint`: Content hashes for artifact ids.
//! - `followup`: Stage follow-up messages per lead tier.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `notifier`: Downstream artifact sinks (n8n, Notion, Telegram).
//! - `orchestrator`: Provider fan-out with dependency ordering.
//! - `prompts`: Task plans and prompts per content task.
//! - `providers`: Per-provider HTTP clients.
//! - `repository`: In-memory artifact store and dashboard counters.
//! - `scoring`: Lead scoring and deal probability.
//! - `webhook_handler`: n8n workflow trigger handler.

pub mod api;
pub mod core;
pub mod integrations;

pub mod app;
pub mod catalog;
pub mod circuit_breaker;
pub mod composer;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod followup;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod repository;
pub mod scoring;
pub mod webhook_handler;
