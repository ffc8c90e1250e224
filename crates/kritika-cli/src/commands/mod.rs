pub mod create_user;

pub trait Executor {
    async fn run(self) -> anyhow::Result<()>;
}
