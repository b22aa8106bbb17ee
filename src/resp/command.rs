use bytes::Bytes;

/// A single argument of a command.
///
/// The set of types that can be sent is closed, each variant has exactly one encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Sent as the bulk string `null`
    Null,
    /// Sent as a bulk string holding the UTF-8 bytes of the text
    Text(String),
    /// Sent as a bulk string as-is
    Bytes(Bytes),
    /// Sent as a RESP integer
    Integer(i64),
    /// Sent as a nested RESP array
    Nested(Vec<Arg>),
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl From<&String> for Arg {
    fn from(s: &String) -> Self {
        Arg::Text(s.clone())
    }
}

impl From<Bytes> for Arg {
    fn from(b: Bytes) -> Self {
        Arg::Bytes(b)
    }
}

impl From<&[u8]> for Arg {
    fn from(b: &[u8]) -> Self {
        Arg::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Arg {
    fn from(b: Vec<u8>) -> Self {
        Arg::Bytes(b.into())
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(args: Vec<Arg>) -> Self {
        Arg::Nested(args)
    }
}

impl<T> From<Option<T>> for Arg
where
    T: Into<Arg>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Null, Into::into)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Arg {
                fn from(i: $t) -> Self {
                    Arg::Integer(i64::from(i))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

/// An ordered sequence of arguments, the first one usually being the command's name.
///
/// ```
/// use redline::{cmd, Arg, Command};
///
/// let set = cmd("SET").arg("key").arg(42);
/// assert_eq!(set, Command::from(vec![Arg::from("SET"), Arg::from("key"), Arg::from(42)]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    args: Vec<Arg>,
}

impl Command {
    /// Creates a command with the given name as its first argument.
    pub fn new<A>(name: A) -> Self
    where
        A: Into<Arg>,
    {
        Self {
            args: vec![name.into()],
        }
    }

    /// Appends an argument.
    pub fn arg<A>(mut self, arg: A) -> Self
    where
        A: Into<Arg>,
    {
        self.args.push(arg.into());
        self
    }

    /// Get the arguments in order.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` if the command has no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Shorthand for [`Command::new`].
pub fn cmd<A>(name: A) -> Command
where
    A: Into<Arg>,
{
    Command::new(name)
}

impl From<Vec<Arg>> for Command {
    fn from(args: Vec<Arg>) -> Self {
        Self { args }
    }
}

impl<T, const N: usize> From<[T; N]> for Command
where
    T: Into<Arg>,
{
    fn from(args: [T; N]) -> Self {
        args.into_iter().collect()
    }
}

impl<T> FromIterator<T> for Command
where
    T: Into<Arg>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_argument_order() {
        let cmd = cmd("SET").arg("key").arg(Bytes::from("value")).arg(10u32);
        assert_eq!(
            cmd.args(),
            &[
                Arg::Text("SET".into()),
                Arg::Text("key".into()),
                Arg::Bytes("value".into()),
                Arg::Integer(10),
            ]
        );
    }

    #[test]
    fn option_none_is_null() {
        let arg: Arg = Option::<&str>::None.into();
        assert_eq!(arg, Arg::Null);
        let arg: Arg = Some("x").into();
        assert_eq!(arg, Arg::Text("x".into()));
    }

    #[test]
    fn from_array_and_iterator() {
        let a = Command::from(["GET", "key"]);
        let b: Command = vec!["GET", "key"].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(Command::default().is_empty());
    }
}
