use std::future::Future;

/// Request/response seam between services and storage.
///
/// Each operation is a plain request struct; the service (or the
/// [`DatabaseProcessor`](crate::sqlx::DatabaseProcessor)) implements
/// `Processor<Request>` for it. Handlers stay thin and every operation gets
/// its own instrumented, independently testable unit.
pub trait Processor<Input> {
    type Output;
    type Error;

    fn process(
        &self,
        input: Input,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}
