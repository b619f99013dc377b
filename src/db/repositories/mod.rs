mod attributions;
mod conversations;
mod events;
mod orders;
mod sessions;
mod suggestions;
mod triggers;
