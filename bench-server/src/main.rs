use mimalloc::MiMalloc;

mod app;
mod config;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let _guard = rt.enter();
    rt.block_on(app::run()).unwrap();
}
