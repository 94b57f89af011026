mod endpoints;
mod health;
mod metrics;

macros_utils::routes! {
    module endpoints,
    module health,
    module metrics,
}
