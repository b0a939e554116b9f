/// A value the operator has explicitly approved.
///
/// Destructive operations (purge, full-replace import) only accept their
/// arguments wrapped in `Confirmed`, so the approval step has to happen at the
/// call site before the operation can be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed<T>(T);

impl<T> Confirmed<T> {
    pub fn new(value: T) -> Self {
        Confirmed(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}
