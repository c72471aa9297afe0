mod draft;
mod orchestrator;
mod published;
mod rebuild;
