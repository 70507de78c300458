use std::sync::{Arc, Mutex};

use crate::cancellable::Cancellable;
use crate::completion::{Completion, Never};
use crate::demand::Demand;
use crate::lock;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

/// A subscriber that writes every value into a field of a shared object.
///
/// `field` picks the place to write from the target. The target is only
/// reachable through the subscriber until the stream completes or is
/// cancelled, after which the subscriber lets go of it.
///
/// ```
/// # use std::sync::{Arc, Mutex};
/// # use backflow::{CurrentValueSubject, Never, PublisherExt};
/// #[derive(Default)]
/// struct Thermostat { target: f32 }
///
/// let thermostat = Arc::new(Mutex::new(Thermostat::default()));
/// let setting = CurrentValueSubject::<f32, Never>::new(20.5);
/// let _binding = setting.assign(&thermostat, |t| &mut t.target);
/// assert_eq!(thermostat.lock().unwrap().target, 20.5);
/// setting.send(18.0);
/// assert_eq!(thermostat.lock().unwrap().target, 18.0);
/// ```
pub struct Assign<T, A> {
    link: Upstream,
    target: Mutex<Option<Arc<Mutex<T>>>>,
    field: A,
}

impl<T, A> Assign<T, A> {
    /// Write values into `field(&mut target)`.
    pub fn new(target: &Arc<Mutex<T>>, field: A) -> Assign<T, A> {
        Assign {
            link: Upstream::new(),
            target: Mutex::new(Some(target.clone())),
            field,
        }
    }

    fn release(&self) {
        let target = lock(&self.target).take();
        drop(target);
    }
}

impl<T, V, A> Subscriber for Assign<T, A>
where
    T: Send + 'static,
    V: Send + 'static,
    A: Fn(&mut T) -> &mut V + Send + Sync + 'static,
{
    type Input = V;
    type Failure = Never;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.link.request(Demand::Unlimited);
        }
    }

    fn receive(&self, input: V) -> Demand {
        let target = lock(&self.target).clone();
        if let Some(target) = target {
            *(self.field)(&mut lock(&target)) = input;
        }
        Demand::none()
    }

    fn receive_completion(&self, _completion: Completion<Never>) {
        if self.link.complete() {
            self.release();
        }
    }
}

impl<T, A> Cancellable for Assign<T, A>
where
    T: Send,
    A: Send + Sync,
{
    fn cancel(&self) {
        self.link.cancel();
        self.release();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::completion::Completion;
    use crate::ext::PublisherExt;
    use crate::publishers::PassthroughSubject;

    #[derive(Default)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[test]
    fn writes_selected_field() {
        let profile = Arc::new(Mutex::new(Profile::default()));
        let names = PassthroughSubject::<String, Never>::new();
        let visits = PassthroughSubject::<u32, Never>::new();
        let _a = names.assign(&profile, |p| &mut p.name);
        let _b = visits.assign(&profile, |p| &mut p.visits);
        names.send("ada".to_string());
        visits.send(3);
        let profile = profile.lock().unwrap();
        assert_eq!(profile.name, "ada");
        assert_eq!(profile.visits, 3);
    }

    #[test]
    fn releases_target_on_completion() {
        let profile = Arc::new(Mutex::new(Profile::default()));
        let visits = PassthroughSubject::<u32, Never>::new();
        let _handle = visits.assign(&profile, |p| &mut p.visits);
        assert_eq!(Arc::strong_count(&profile), 2);
        visits.send_completion(Completion::Finished);
        assert_eq!(Arc::strong_count(&profile), 1);
    }

    #[test]
    fn releases_target_on_cancel() {
        let profile = Arc::new(Mutex::new(Profile::default()));
        let visits = PassthroughSubject::<u32, Never>::new();
        let handle = visits.assign(&profile, |p| &mut p.visits);
        drop(handle);
        visits.send(9);
        assert_eq!(Arc::strong_count(&profile), 1);
        assert_eq!(profile.lock().unwrap().visits, 0);
    }
}
