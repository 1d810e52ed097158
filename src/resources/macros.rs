/// Builds an array of `MotorHandler`s, one per port, in a `const` friendly way.
///
/// ```ignore
/// static MOTORS: [MotorHandler; 2] = create_motors!(Port::A, Port::B);
/// ```
#[macro_export]
macro_rules! create_motors {
    ($($port:expr),* $(,)?) => {
        [
            $($crate::resources::MotorHandler::new($port)),*
        ]
    };
}
