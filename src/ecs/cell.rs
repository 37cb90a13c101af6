//! Borrow tracking for the component stores of a `World`.
//!
//! Every store sits behind a `RefCell` whose borrow state is a single atomic
//! word: zero when free, the number of readers while shared, and `EXCLUSIVE`
//! while a writer holds it. Conflicting borrows panic instead of blocking, so a
//! system that asks for the same store twice fails loudly.

use std::cell::UnsafeCell;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

const EXCLUSIVE: usize = !0;

/// Shared access to a value inside a `RefCell`, released on drop.
#[derive(Debug)]
pub struct Ref<'a, T: 'a + ?Sized> {
    state: &'a AtomicUsize,
    value: &'a T,
}

/// Exclusive access to a value inside a `RefCell`, released on drop.
#[derive(Debug)]
pub struct RefMut<'a, T: 'a + ?Sized> {
    state: &'a AtomicUsize,
    value: &'a mut T,
}

/// A `std::cell::RefCell` which could be shared between threads.
#[derive(Debug)]
pub struct RefCell<T: ?Sized> {
    state: AtomicUsize,
    inner: UnsafeCell<T>,
}

unsafe impl<T> Sync for RefCell<T> where T: ?Sized + Send + Sync {}

impl<T> RefCell<T> {
    pub fn new(value: T) -> Self {
        RefCell {
            state: AtomicUsize::new(0),
            inner: UnsafeCell::new(value),
        }
    }
}

impl<T: ?Sized> RefCell<T> {
    /// Takes shared access. Any number of readers may coexist.
    ///
    /// # Panics
    ///
    /// Panics if a `RefMut` of this cell is alive.
    pub fn borrow(&self) -> Ref<T> {
        let mut readers = self.state.load(Ordering::Acquire);
        loop {
            assert!(readers != EXCLUSIVE, "store is borrowed mutably");

            match self.state.compare_exchange_weak(
                readers,
                readers + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(current) => readers = current,
            }
        }

        Ref {
            state: &self.state,
            value: unsafe { &*self.inner.get() },
        }
    }

    /// Takes exclusive access.
    ///
    /// # Panics
    ///
    /// Panics if any `Ref` or `RefMut` of this cell is alive.
    pub fn borrow_mut(&self) -> RefMut<T> {
        let acquired = self
            .state
            .compare_exchange(0, EXCLUSIVE, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();

        assert!(acquired, "store is borrowed");

        RefMut {
            state: &self.state,
            value: unsafe { &mut *self.inner.get() },
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<'a, T: 'a + ?Sized> Ref<'a, T> {
    /// Narrows the borrow to a part of the value, e.g. a downcast store.
    pub fn map<U, F>(orig: Ref<'a, T>, f: F) -> Ref<'a, U>
    where
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        let (state, value) = (orig.state, orig.value);
        mem::forget(orig);

        Ref {
            state,
            value: f(value),
        }
    }
}

impl<'a, T: 'a + ?Sized> Deref for Ref<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<'a, T: 'a + ?Sized> Drop for Ref<'a, T> {
    fn drop(&mut self) {
        self.state.fetch_sub(1, Ordering::Release);
    }
}

impl<'a, T: 'a + ?Sized> RefMut<'a, T> {
    /// Narrows the borrow to a part of the value, e.g. a downcast store.
    pub fn map<U, F>(orig: RefMut<'a, T>, f: F) -> RefMut<'a, U>
    where
        U: ?Sized,
        F: FnOnce(&mut T) -> &mut U,
    {
        let state = orig.state;
        // The guard is forgotten right away, so the value is reachable through
        // one path only.
        let value = unsafe { &mut *(orig.value as *mut T) };
        mem::forget(orig);

        RefMut {
            state,
            value: f(value),
        }
    }
}

impl<'a, T: 'a + ?Sized> Deref for RefMut<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<'a, T: 'a + ?Sized> DerefMut for RefMut<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value
    }
}

impl<'a, T: 'a + ?Sized> Drop for RefMut<'a, T> {
    fn drop(&mut self) {
        self.state.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shared_borrows() {
        let cell = RefCell::new(1);
        let a = cell.borrow();
        let b = cell.borrow();
        assert_eq!(*a + *b, 2);
    }

    #[test]
    fn reborrow_after_release() {
        let cell = RefCell::new(1);
        {
            let mut v = cell.borrow_mut();
            *v = 2;
        }

        assert_eq!(*cell.borrow(), 2);
        *cell.borrow_mut() += 1;
        assert_eq!(*cell.borrow(), 3);
    }

    #[test]
    fn mapped() {
        let cell = RefCell::new((1, String::from("store")));
        {
            let mut name = RefMut::map(cell.borrow_mut(), |v| &mut v.1);
            name.push('s');
        }

        let name = Ref::map(cell.borrow(), |v| v.1.as_str());
        assert_eq!(&*name, "stores");
        assert_eq!(cell.borrow().0, 1);
    }

    #[test]
    #[should_panic(expected = "store is borrowed")]
    fn write_while_reading() {
        let cell = RefCell::new(1);
        let _r = cell.borrow();
        cell.borrow_mut();
    }

    #[test]
    #[should_panic(expected = "borrowed mutably")]
    fn read_while_writing() {
        let cell = RefCell::new(1);
        let _w = cell.borrow_mut();
        cell.borrow();
    }
}
