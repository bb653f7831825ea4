//! Protocols and Generated Proxies
//!
//! A protocol is an object-safe trait whose methods take
//! `&mut ActorContext` first and return `ActorResult<T>`. The
//! [`protocol!`](crate::protocol!) macro declares the trait together with its
//! proxy type (`<Name>Proxy`), so a typed call on the proxy becomes a
//! queued, asynchronous operation on the actor's mailbox:
//!
//! - `-> ActorResult<()>` methods become fire-and-forget `tell`s and the
//!   proxy method returns `()`
//! - every other `-> ActorResult<T>` method becomes an `ask` and the proxy
//!   method returns [`Completes<T>`](crate::Completes)
//!
//! ```ignore
//! protocol! {
//!     pub trait Counter {
//!         fn increment(&mut self, ctx: &mut ActorContext, by: u64) -> ActorResult<()>;
//!         fn total(&mut self, ctx: &mut ActorContext) -> ActorResult<u64>;
//!     }
//! }
//!
//! let counter: CounterProxy = world.actor_for(Definition::has(|_| Ok(Tally::default())))?;
//! counter.increment(2);
//! assert_eq!(counter.total().await_timeout(timeout)?, 2);
//! ```
//!
//! One actor may implement several protocols; [`ProtocolSet`] hands back
//! one proxy per protocol, all bound to the same mailbox.

use crate::actor::Actor;
use crate::cell::{self, ActorCell};
use crate::handle::Handle;
use std::any::TypeId;
use std::sync::Arc;

/// Marker implemented for `dyn Trait` of every declared protocol
pub trait Protocol: 'static {
    const NAME: &'static str;
}

/// Generated proxy type of a protocol
pub trait ProtocolProxy: Clone + Send + Sync + 'static {
    type Protocol: ?Sized + Protocol;

    fn from_handle(handle: Handle<Self::Protocol>) -> Self;

    fn handle(&self) -> &Handle<Self::Protocol>;
}

/// Protocol view of a concrete behavior; generated as a blanket impl for
/// every actor implementing the protocol trait
pub trait Implements<A: Actor>: Protocol {
    fn view(actor: &mut A) -> &mut Self;
}

/// Binds proxies for the protocols `A` implements
pub struct Binder<A: Actor> {
    cell: Arc<ActorCell<A>>,
}

impl<A: Actor> Binder<A> {
    pub(crate) fn new(cell: Arc<ActorCell<A>>) -> Self {
        Self { cell }
    }

    pub fn proxy<X>(&self) -> X
    where
        X: ProtocolProxy,
        X::Protocol: Implements<A>,
    {
        cell::proxy_for::<X, A>(&self.cell)
    }
}

/// Tuple of proxies handed back by
/// [`actor_for_protocols`](crate::Stage::actor_for_protocols)
pub trait ProtocolSet<A: Actor>: Sized {
    /// Protocol used to pick a common supervisor
    fn primary() -> TypeId;

    fn bind(binder: &Binder<A>) -> Self;
}

macro_rules! protocol_set {
    ($first:ident $(, $rest:ident)*) => {
        impl<A, $first, $($rest),*> ProtocolSet<A> for ($first, $($rest),*)
        where
            A: Actor,
            $first: ProtocolProxy,
            $first::Protocol: Implements<A>,
            $($rest: ProtocolProxy, $rest::Protocol: Implements<A>,)*
        {
            fn primary() -> TypeId {
                TypeId::of::<$first>()
            }

            fn bind(binder: &Binder<A>) -> Self {
                (binder.proxy::<$first>(), $(binder.proxy::<$rest>()),*)
            }
        }
    };
}

protocol_set!(P1, P2);
protocol_set!(P1, P2, P3);
protocol_set!(P1, P2, P3, P4);
protocol_set!(P1, P2, P3, P4, P5);

/// Declare a protocol trait and its `<Name>Proxy`.
///
/// Every method must have the shape
/// `fn op(&mut self, ctx: &mut ActorContext, arg: Type, ..) -> ActorResult<T>;`
#[macro_export]
macro_rules! protocol {
    (@munch [$($attr:tt)*] [$vis:vis] $name:ident [$($decl:tt)*] [$($proxy:tt)*]
        $(#[$op_attr:meta])*
        fn $op:ident(&mut self, $ctx:ident: &mut ActorContext $(, $arg:ident: $arg_ty:ty)*) -> ActorResult<()>;
        $($rest:tt)*
    ) => {
        $crate::protocol! {
            @munch [$($attr)*] [$vis] $name
            [
                $($decl)*
                $(#[$op_attr])*
                fn $op(&mut self, $ctx: &mut $crate::ActorContext $(, $arg: $arg_ty)*) -> $crate::ActorResult<()>;
            ]
            [
                $($proxy)*
                $(#[$op_attr])*
                pub fn $op(&self $(, $arg: $arg_ty)*) {
                    self.handle.tell(
                        concat!(stringify!($op), "(", stringify!($($arg_ty),*), ")"),
                        move |actor, ctx| actor.$op(ctx $(, $arg)*),
                    )
                }
            ]
            $($rest)*
        }
    };

    (@munch [$($attr:tt)*] [$vis:vis] $name:ident [$($decl:tt)*] [$($proxy:tt)*]
        $(#[$op_attr:meta])*
        fn $op:ident(&mut self, $ctx:ident: &mut ActorContext $(, $arg:ident: $arg_ty:ty)*) -> ActorResult<$ret:ty>;
        $($rest:tt)*
    ) => {
        $crate::protocol! {
            @munch [$($attr)*] [$vis] $name
            [
                $($decl)*
                $(#[$op_attr])*
                fn $op(&mut self, $ctx: &mut $crate::ActorContext $(, $arg: $arg_ty)*) -> $crate::ActorResult<$ret>;
            ]
            [
                $($proxy)*
                $(#[$op_attr])*
                pub fn $op(&self $(, $arg: $arg_ty)*) -> $crate::Completes<$ret> {
                    self.handle.ask(
                        concat!(stringify!($op), "(", stringify!($($arg_ty),*), ")"),
                        move |actor, ctx| actor.$op(ctx $(, $arg)*),
                    )
                }
            ]
            $($rest)*
        }
    };

    (@munch [$($attr:tt)*] [$vis:vis] $name:ident [$($decl:tt)*] [$($proxy:tt)*]) => {
        $($attr)*
        $vis trait $name {
            $($decl)*
        }

        $crate::paste::paste! {
            #[doc = concat!("Asynchronous proxy for [`", stringify!($name), "`].")]
            #[derive(Clone)]
            $vis struct [<$name Proxy>] {
                handle: $crate::Handle<dyn $name>,
            }

            impl [<$name Proxy>] {
                $($proxy)*

                pub fn address(&self) -> &$crate::Address {
                    self.handle.address()
                }
            }

            impl $crate::Protocol for dyn $name {
                const NAME: &'static str = stringify!($name);
            }

            impl $crate::ProtocolProxy for [<$name Proxy>] {
                type Protocol = dyn $name;

                fn from_handle(handle: $crate::Handle<dyn $name>) -> Self {
                    Self { handle }
                }

                fn handle(&self) -> &$crate::Handle<dyn $name> {
                    &self.handle
                }
            }

            impl<A: $name + $crate::Actor> $crate::Implements<A> for dyn $name {
                fn view(actor: &mut A) -> &mut Self {
                    actor
                }
            }

            impl ::std::fmt::Debug for [<$name Proxy>] {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.debug_struct(concat!(stringify!($name), "Proxy"))
                        .field("address", self.handle.address())
                        .finish()
                }
            }
        }
    };

    ($(#[$attr:meta])* $vis:vis trait $name:ident { $($body:tt)* }) => {
        $crate::protocol! { @munch [$(#[$attr])*] [$vis] $name [] [] $($body)* }
    };
}
